//! Mall listing payload and its terminal rendering.

use serde::Deserialize;
use serde_json::Value;

pub const MALLS_PATH: &str = "/v1/malls";

const MISSING: &str = "N/A";

/// One page of `GET /v1/malls`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MallPage {
    #[serde(default)]
    pub content: Vec<Mall>,
    pub total_elements: Option<u64>,
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mall {
    /// Numeric or string id, depending on the backend version.
    #[serde(default)]
    pub id: Value,
    pub mall_name: Option<String>,
    pub legal_entity_name: Option<String>,
    #[serde(default)]
    pub is_mall_closed: bool,
    pub contact_person_email_address: Option<String>,
    pub support_email: Option<String>,
    pub address: Option<MallAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MallAddress {
    pub area_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

fn or_missing(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(MISSING)
}

impl Mall {
    fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => MISSING.to_string(),
            other => other.to_string(),
        }
    }

    fn location(&self) -> String {
        let empty = MallAddress::default();
        let address = self.address.as_ref().unwrap_or(&empty);
        format!(
            "{} ({}, {})",
            or_missing(&address.area_name),
            or_missing(&address.city),
            or_missing(&address.state)
        )
    }

    fn status(&self) -> &'static str {
        if self.is_mall_closed {
            "Closed"
        } else {
            "Open"
        }
    }
}

/// Render a page as aligned columns.
pub fn render(page: &MallPage, page_number: u32) -> String {
    if page.content.is_empty() {
        return "No malls found.".to_string();
    }

    let header = [
        "ID".to_string(),
        "NAME".to_string(),
        "LEGAL ENTITY".to_string(),
        "LOCATION".to_string(),
        "CONTACT".to_string(),
        "SUPPORT".to_string(),
        "STATUS".to_string(),
    ];
    let rows: Vec<[String; 7]> = page
        .content
        .iter()
        .map(|mall| {
            [
                mall.id_text(),
                or_missing(&mall.mall_name).to_string(),
                or_missing(&mall.legal_entity_name).to_string(),
                mall.location(),
                or_missing(&mall.contact_person_email_address).to_string(),
                or_missing(&mall.support_email).to_string(),
                mall.status().to_string(),
            ]
        })
        .collect();

    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String; 7]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&header)];
    out.extend(rows.iter().map(line));

    let mut footer = format!("Page {}", page_number + 1);
    if let Some(total_pages) = page.total_pages {
        footer.push_str(&format!(" of {}", total_pages));
    }
    if let Some(total) = page.total_elements {
        footer.push_str(&format!(", {} malls", total));
    }
    out.push(footer);

    out.join("\n")
}
