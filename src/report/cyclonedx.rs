//! `CycloneDX` 1.5 JSON output.
//!
//! The product is the metadata component and every report record becomes a
//! `library` component keyed by its Go package URL.

use serde::Serialize;

use crate::models::{Report, ReportRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycloneDxBom {
    pub bom_format: &'static str,
    pub spec_version: &'static str,
    pub version: u32,
    pub metadata: Metadata,
    pub components: Vec<Component>,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub timestamp: String,
    pub component: Component,
}

#[derive(Debug, Serialize)]
pub struct Component {
    #[serde(rename = "bom-ref")]
    pub bom_ref: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(rename = "externalReferences", skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
}

#[derive(Debug, Serialize)]
pub struct ExternalReference {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LicenseChoice {
    pub license: License,
}

#[derive(Debug, Serialize)]
pub struct License {
    pub name: String,
}

/// Lowercase ASCII words joined by single dashes.
pub fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn to_purl(record: &ReportRecord) -> String {
    format!("pkg:golang/{}@{}", record.name, installed_version(record))
}

/// Tag when one is known, the pinned commit otherwise.
fn installed_version(record: &ReportRecord) -> &str {
    record
        .installed
        .version
        .as_deref()
        .unwrap_or(&record.installed.commit)
}

fn to_component(record: &ReportRecord) -> Component {
    let purl = to_purl(record);
    let external_references = if record.repository_url.is_empty() {
        Vec::new()
    } else {
        vec![ExternalReference {
            type_: "vcs",
            url: record.repository_url.clone(),
        }]
    };
    let licenses = record
        .license
        .iter()
        .map(|name| LicenseChoice {
            license: License { name: name.clone() },
        })
        .collect();

    Component {
        bom_ref: purl.clone(),
        type_: "library",
        name: record.name.clone(),
        version: installed_version(record).to_string(),
        purl: Some(purl),
        external_references,
        licenses,
    }
}

pub fn to_cyclonedx(report: &Report) -> CycloneDxBom {
    let product = Component {
        bom_ref: format!("pkg:golang/{}", slug(&report.product)),
        type_: "application",
        name: report.product.clone(),
        version: report.build_commit.clone(),
        purl: None,
        external_references: Vec::new(),
        licenses: Vec::new(),
    };

    CycloneDxBom {
        bom_format: "CycloneDX",
        spec_version: "1.5",
        version: 1,
        metadata: Metadata {
            timestamp: report.generated_at.clone(),
            component: product,
        },
        components: report.dependencies.iter().map(to_component).collect(),
    }
}

pub fn render(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_cyclonedx(report))
}
