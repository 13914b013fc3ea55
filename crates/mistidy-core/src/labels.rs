use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed per-store columns that precede the month columns in an MIS export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    StoreName,
    Parameter,
    CafeCode,
    Region,
    Category,
    ForSsg,
    AreaStore,
    StoreStartDate,
    Vintage,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::StoreName,
        MetadataField::Parameter,
        MetadataField::CafeCode,
        MetadataField::Region,
        MetadataField::Category,
        MetadataField::ForSsg,
        MetadataField::AreaStore,
        MetadataField::StoreStartDate,
        MetadataField::Vintage,
    ];

    /// Header text as it appears in the source workbook. Matching is exact.
    pub fn raw_label(&self) -> &'static str {
        match self {
            MetadataField::StoreName => "Store Name",
            MetadataField::Parameter => "Parameter",
            MetadataField::CafeCode => "Cafe Codes",
            MetadataField::Region => "Region",
            MetadataField::Category => "Category",
            MetadataField::ForSsg => "FOR SSG",
            MetadataField::AreaStore => "Area",
            MetadataField::StoreStartDate => "Store Start Date",
            MetadataField::Vintage => "Vintage",
        }
    }

    pub fn canonical_name(&self) -> &'static str {
        match self {
            MetadataField::StoreName => "store_name",
            MetadataField::Parameter => "parameter",
            MetadataField::CafeCode => "cafe_code",
            MetadataField::Region => "region",
            MetadataField::Category => "category",
            MetadataField::ForSsg => "for_ssg",
            MetadataField::AreaStore => "area_store",
            MetadataField::StoreStartDate => "store_start_date",
            MetadataField::Vintage => "vintage",
        }
    }

    pub fn from_raw_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.raw_label() == label)
    }

    pub fn from_canonical_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.canonical_name() == name)
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Renames the nine known metadata headers to their canonical names and passes every
/// other label through unchanged.
pub fn normalize_label(label: &str) -> String {
    match MetadataField::from_raw_label(label) {
        Some(field) => field.canonical_name().to_string(),
        None => label.to_string(),
    }
}

pub fn normalize_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels.iter().map(|label| normalize_label(label.as_ref())).collect()
}
