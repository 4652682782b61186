//! Prescription rate documents and their merge into cell collections
//!
//! A prescription is an XML document of `MapZoneRate` elements (one watering
//! rate per grid cell, keyed by bearing and distance sequence numbers) and
//! `WateringColor` elements (the colour legend). The document keeps its
//! source text; edits are spliced into the byte ranges of the edited
//! `WateringRatePercent` values, so everything else serializes unchanged.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use roxmltree::{Document, Node, ParsingOptions};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::error::PrescriptionError;
use crate::models::{
    CellCollection, CellStyle, Legend, LegendEntry, RateEntry, RateKey, NO_DATA_COLOR,
};

/// Namespaces tried, in order, before any other namespace holding rates
pub const KNOWN_NAMESPACES: &[&str] = &[
    "http://tempuri.org/VSSILinearData.xsd",
    "http://tempuri.org/VSSI.xsd",
];

const RATE_ELEMENT: &str = "MapZoneRate";
const COLOR_ELEMENT: &str = "WateringColor";
const BEARING_ATTR: &str = "BearingSeqNum";
const DISTANCE_ATTR: &str = "DistanceSeqNum";
const RATE_ATTR: &str = "WateringRatePercent";
const THRESHOLD_ATTR: &str = "WateringPercent";
const COLOR_ATTR: &str = "Color";

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, PartialEq)]
struct RateNode {
    key: RateKey,
    /// Byte range of the attribute value in the source text
    value_range: Range<usize>,
    /// `None` when the source value is not a number
    rate: Option<Decimal>,
}

/// A parsed prescription that can be edited and written back
#[derive(Debug, Clone, PartialEq)]
pub struct RateDocument {
    source: String,
    namespace: String,
    nodes: Vec<RateNode>,
    /// First node in document order for each key
    table: HashMap<RateKey, usize>,
    legend: Legend,
    /// Node index to edited rate
    edits: BTreeMap<usize, Decimal>,
}

fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn elements<'a, 'input>(
    doc: &'a Document<'input>,
    namespace: &'a str,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.descendants().filter(move |n| {
        n.is_element()
            && n.tag_name().name() == name
            && n.tag_name().namespace().unwrap_or("") == namespace
    })
}

/// Known namespaces first, then the first other namespace with rate elements
fn find_namespace(doc: &Document) -> Option<String> {
    let mut present = Vec::new();
    for node in doc.descendants() {
        if node.is_element() && node.tag_name().name() == RATE_ELEMENT {
            let ns = node.tag_name().namespace().unwrap_or("");
            if !present.contains(&ns) {
                present.push(ns);
            }
        }
    }
    KNOWN_NAMESPACES
        .iter()
        .find(|known| present.contains(*known))
        .map(|ns| ns.to_string())
        .or_else(|| present.first().map(|ns| ns.to_string()))
}

impl RateDocument {
    pub fn parse(xml: impl Into<String>) -> Result<Self, PrescriptionError> {
        let source = xml.into();
        let offset = if source.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };

        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let doc = Document::parse_with_options(&source[offset..], options)
            .map_err(|e| PrescriptionError::Xml(e.to_string()))?;
        let namespace = find_namespace(&doc).ok_or(PrescriptionError::NamespaceNotFound)?;

        let mut nodes = Vec::new();
        let mut table = HashMap::new();
        for node in elements(&doc, &namespace, RATE_ELEMENT) {
            let (Some(bearing), Some(distance), Some(value)) = (
                node.attribute(BEARING_ATTR).map(str::trim).filter(|s| !s.is_empty()),
                node.attribute(DISTANCE_ATTR).map(str::trim).filter(|s| !s.is_empty()),
                node.attribute_node(RATE_ATTR),
            ) else {
                continue;
            };
            let key = RateKey::new(bearing, distance);
            let range = value.range_value();
            table.entry(key.clone()).or_insert(nodes.len());
            nodes.push(RateNode {
                key,
                value_range: (range.start + offset)..(range.end + offset),
                rate: parse_number(value.value()),
            });
        }

        let legend = Legend::new(
            elements(&doc, &namespace, COLOR_ELEMENT)
                .filter_map(|node| {
                    let threshold = parse_number(node.attribute(THRESHOLD_ATTR)?)?;
                    let color = convert_color(node.attribute(COLOR_ATTR)?);
                    Some(LegendEntry::new(threshold, color))
                })
                .collect(),
        );

        drop(doc);
        Ok(Self {
            source,
            namespace,
            nodes,
            table,
            legend,
            edits: BTreeMap::new(),
        })
    }

    /// Decode the base64 `encoded_vri` payload and parse it
    pub fn from_base64(encoded: &str) -> Result<Self, PrescriptionError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PrescriptionError::Encoding(e.to_string()))?;
        let xml = String::from_utf8(bytes).map_err(|e| PrescriptionError::Encoding(e.to_string()))?;
        Self::parse(xml)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of rate elements, duplicates included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_key(&self, key: &RateKey) -> bool {
        self.table.contains_key(key)
    }

    /// Current rate for a key, edits applied
    pub fn rate(&self, key: &RateKey) -> Option<Decimal> {
        let index = *self.table.get(key)?;
        self.edits
            .get(&index)
            .copied()
            .or(self.nodes[index].rate)
    }

    /// One entry per key with a numeric rate, in document order
    pub fn entries(&self) -> Vec<RateEntry> {
        let mut indices: Vec<usize> = self.table.values().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .filter_map(|i| {
                let node = &self.nodes[i];
                let rate_percent = self.edits.get(&i).copied().or(node.rate)?;
                Some(RateEntry {
                    bearing_seq: node.key.bearing_seq.clone(),
                    distance_seq: node.key.distance_seq.clone(),
                    rate_percent,
                })
            })
            .collect()
    }

    /// Colour legend, ascending by threshold
    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Set the rate for every listed key
    ///
    /// Keys that exist are updated even when others are missing; the
    /// missing ones are reported together with the number updated.
    pub fn update_rates(&mut self, keys: &[RateKey], rate: Decimal) -> Result<usize, PrescriptionError> {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(PrescriptionError::InvalidRate(format!(
                "{} is negative",
                rate
            )));
        }
        let mut missing = Vec::new();
        let mut updated = 0;
        for key in keys {
            match self.table.get(key) {
                Some(&index) => {
                    self.edits.insert(index, rate);
                    updated += 1;
                }
                None if !missing.contains(key) => missing.push(key.clone()),
                None => {}
            }
        }
        if missing.is_empty() {
            Ok(updated)
        } else {
            Err(PrescriptionError::RateKeyNotFound { missing, updated })
        }
    }

    /// The source text with edited rates spliced in
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (&index, rate) in &self.edits {
            let range = &self.nodes[index].value_range;
            out.push_str(&self.source[cursor..range.start]);
            out.push_str(&rate.normalize().to_string());
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.serialize())
    }
}

/// Convert a rate coming from JSON or the browser
pub fn rate_from_f64(rate: f64) -> Result<Decimal, PrescriptionError> {
    if !rate.is_finite() {
        return Err(PrescriptionError::InvalidRate(format!("{} is not a finite number", rate)));
    }
    if rate < 0.0 {
        return Err(PrescriptionError::InvalidRate(format!("{} is negative", rate)));
    }
    Decimal::from_f64(rate)
        .map(|d| d.normalize())
        .ok_or_else(|| PrescriptionError::InvalidRate(format!("{} is out of range", rate)))
}

/// `#AARRGGBB` to `#rrggbb` when opaque, `rgba(r,g,b,a)` otherwise
///
/// Any other form is returned unchanged.
pub fn convert_color(argb: &str) -> String {
    let Some(hex) = argb.strip_prefix('#') else {
        return argb.to_string();
    };
    if hex.len() != 8 || !hex.is_ascii() {
        return argb.to_string();
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (Some(a), Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4), channel(6))
    else {
        return argb.to_string();
    };
    if a == u8::MAX {
        format!("#{}", &hex[2..])
    } else {
        format!("rgba({},{},{},{})", r, g, b, f64::from(a) / 255.0)
    }
}

/// First legend entry whose threshold is at or above the rate
///
/// Rates above every threshold take the last entry's colour; a missing rate
/// or an empty legend gives [`NO_DATA_COLOR`].
pub fn color_for_rate(rate: Option<Decimal>, legend: &Legend) -> String {
    let (Some(rate), Some(last)) = (rate, legend.entries().last()) else {
        return NO_DATA_COLOR.to_string();
    };
    legend
        .entries()
        .iter()
        .find(|e| rate <= e.threshold)
        .unwrap_or(last)
        .color
        .clone()
}

pub fn prescription_style(rate: Option<Decimal>, legend: &Legend) -> CellStyle {
    CellStyle::prescription(color_for_rate(rate, legend))
}

/// Attach document rates to cells; returns how many cells got a rate
///
/// Cells without both sequence numbers, or whose key has no numeric rate,
/// are left without one.
pub fn merge_rates(cells: &mut CellCollection, document: &RateDocument) -> usize {
    let mut rated = 0;
    for cell in cells.iter_mut() {
        cell.rate_percent = cell.rate_key().and_then(|key| document.rate(&key));
        if cell.rate_percent.is_some() {
            rated += 1;
        }
    }
    rated
}

/// Update the document and the matching cells together
///
/// On a partial failure the found keys are still applied to both.
pub fn update_rate(
    cells: &mut CellCollection,
    document: &mut RateDocument,
    keys: &[RateKey],
    rate: Decimal,
) -> Result<usize, PrescriptionError> {
    let result = document.update_rates(keys, rate);
    if let Err(PrescriptionError::InvalidRate(_)) = result {
        return result;
    }
    for cell in cells.iter_mut() {
        if let Some(key) = cell.rate_key() {
            if keys.contains(&key) && document.contains_key(&key) {
                cell.rate_percent = document.rate(&key);
            }
        }
    }
    result
}
