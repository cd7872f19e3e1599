//! # Records
//!
//! The loose document shape shared by the store, the wire, and the
//! aggregation engine.
//!
//! No field is guaranteed present. The source dataset writes `""` where a
//! value is missing, including in numeric positions, so deserialization
//! maps empty strings to `None` instead of failing. Absent and empty are
//! the same thing everywhere downstream.

use serde::{Deserialize, Deserializer, Serialize};

/// One axis of filtering. The set is closed; a dimension that does not
/// exist is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    EndYear,
    Topic,
    Sector,
    Region,
    Pestle,
    Source,
    Swot,
    Country,
    City,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::EndYear,
        Dimension::Topic,
        Dimension::Sector,
        Dimension::Region,
        Dimension::Pestle,
        Dimension::Source,
        Dimension::Swot,
        Dimension::Country,
        Dimension::City,
    ];
}

/// The value picked for one dimension of a [`FilterSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    All,
    Year(i32),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "loose_int")]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub pestle: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub swot: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub intensity: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub likelihood: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub relevance: Option<f64>,
}

impl Record {
    /// The record's value for a string dimension, with empty treated as
    /// absent. `EndYear` is numeric and has no text value.
    pub fn text_field(&self, dimension: Dimension) -> Option<&str> {
        let field = match dimension {
            Dimension::EndYear => return None,
            Dimension::Topic => &self.topic,
            Dimension::Sector => &self.sector,
            Dimension::Region => &self.region,
            Dimension::Pestle => &self.pestle,
            Dimension::Source => &self.source,
            Dimension::Swot => &self.swot,
            Dimension::Country => &self.country,
            Dimension::City => &self.city,
        };

        field.as_deref().filter(|value| !value.is_empty())
    }
}

/// Active filter selection, one slot per dimension. `None` is the
/// sentinel meaning "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub end_year: Option<i32>,
    pub topic: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub pestle: Option<String>,
    pub source: Option<String>,
    pub swot: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl FilterSet {
    pub fn is_unrestricted(&self) -> bool {
        *self == FilterSet::default()
    }

    /// Replace one dimension's selection. Pairing a selection with the
    /// wrong dimension kind is a programming error and panics.
    pub fn apply(&mut self, dimension: Dimension, selection: Selection) {
        if dimension == Dimension::EndYear {
            self.end_year = match selection {
                Selection::All => None,
                Selection::Year(year) => Some(year),
                Selection::Text(value) => {
                    panic!("end year filter expects a year, got {value:?}")
                }
            };
            return;
        }

        *self.text_slot(dimension) = match selection {
            Selection::All => None,
            Selection::Text(value) => Some(value),
            Selection::Year(year) => {
                panic!("{dimension:?} filter expects text, got year {year}")
            }
        };
    }

    /// A record matches iff every restricted dimension equals the
    /// record's field. Absent and empty record fields never match a
    /// restriction.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(year) = self.end_year {
            if record.end_year != Some(year) {
                return false;
            }
        }

        Dimension::ALL
            .into_iter()
            .filter(|&dimension| dimension != Dimension::EndYear)
            .all(|dimension| match self.text_selection(dimension) {
                None => true,
                Some(want) => record.text_field(dimension) == Some(want),
            })
    }

    pub fn text_selection(&self, dimension: Dimension) -> Option<&str> {
        let slot = match dimension {
            Dimension::EndYear => return None,
            Dimension::Topic => &self.topic,
            Dimension::Sector => &self.sector,
            Dimension::Region => &self.region,
            Dimension::Pestle => &self.pestle,
            Dimension::Source => &self.source,
            Dimension::Swot => &self.swot,
            Dimension::Country => &self.country,
            Dimension::City => &self.city,
        };

        slot.as_deref()
    }

    fn text_slot(&mut self, dimension: Dimension) -> &mut Option<String> {
        match dimension {
            Dimension::Topic => &mut self.topic,
            Dimension::Sector => &mut self.sector,
            Dimension::Region => &mut self.region,
            Dimension::Pestle => &mut self.pestle,
            Dimension::Source => &mut self.source,
            Dimension::Swot => &mut self.swot,
            Dimension::Country => &mut self.country,
            Dimension::City => &mut self.city,
            Dimension::EndYear => unreachable!("end_year is numeric"),
        }
    }
}

fn loose_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?.map(|value| value as i32))
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Number(value)) => Some(value),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
    })
}
