use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::PostalAddress;

/// Component labels assigned to tokens of a free-text address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressLabel {
    AddressNumber,
    StreetNamePreDirectional,
    StreetName,
    StreetNamePostType,
    StreetNamePostDirectional,
    UspsBoxType,
    UspsBoxId,
    BuildingName,
    OccupancyType,
    OccupancyIdentifier,
    PlaceName,
    StateName,
    ZipCode,
}

/// Validator field a label contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Secondary,
    Primary,
    City,
    State,
    Zip,
}

impl AddressLabel {
    fn component(self) -> Component {
        match self {
            AddressLabel::AddressNumber
            | AddressLabel::StreetNamePreDirectional
            | AddressLabel::StreetName
            | AddressLabel::StreetNamePostType
            | AddressLabel::StreetNamePostDirectional
            | AddressLabel::UspsBoxType
            | AddressLabel::UspsBoxId => Component::Primary,
            AddressLabel::BuildingName
            | AddressLabel::OccupancyType
            | AddressLabel::OccupancyIdentifier => Component::Secondary,
            AddressLabel::PlaceName => Component::City,
            AddressLabel::StateName => Component::State,
            AddressLabel::ZipCode => Component::Zip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressClassification {
    StreetAddress,
    PoBox,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("label {label:?} appears more than once in '{input}'")]
    RepeatedLabel { label: AddressLabel, input: String },
    #[error("address text is empty")]
    Empty,
}

/// Tokens of a free-text address with their labels, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedAddress {
    pub tokens: Vec<(String, AddressLabel)>,
    pub classification: AddressClassification,
}

impl TaggedAddress {
    /// Concatenate labelled tokens into validator components. Components with
    /// no tokens are left blank.
    pub fn components(&self) -> PostalAddress {
        let mut postal = PostalAddress::default();
        for (token, label) in &self.tokens {
            let field = match label.component() {
                Component::Secondary => &mut postal.address1,
                Component::Primary => &mut postal.address2,
                Component::City => &mut postal.city,
                Component::State => &mut postal.state,
                Component::Zip => &mut postal.zip5,
            };
            if !field.is_empty() {
                field.push(' ');
            }
            field.push_str(token);
        }
        postal
    }
}

/// Parses free-text addresses into labelled components.
pub trait AddressTagger: Send + Sync {
    fn tag(&self, text: &str) -> Result<TaggedAddress, TagError>;
}

const OCCUPANCY_KEYWORDS: &[&str] = &[
    "apt", "apartment", "unit", "ste", "suite", "#", "lot", "rm", "room", "fl", "floor", "trlr",
    "spc", "space",
];
const BUILDING_KEYWORDS: &[&str] = &["bldg", "building"];
const STREET_TYPES: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "dr", "drive", "ln", "lane", "blvd",
    "boulevard", "ct", "court", "way", "pl", "place", "cir", "circle", "pkwy", "parkway", "hwy",
    "highway", "ter", "terrace", "trl", "trail", "loop",
];
const DIRECTIONALS: &[&str] = &[
    "n", "s", "e", "w", "ne", "nw", "se", "sw", "north", "south", "east", "west",
];

fn zip_pattern() -> &'static Regex {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    ZIP.get_or_init(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip pattern compiles"))
}

fn state_pattern() -> &'static Regex {
    static STATE: OnceLock<Regex> = OnceLock::new();
    STATE.get_or_init(|| Regex::new(r"^[A-Za-z]{2}$").expect("state pattern compiles"))
}

fn keyword(token: &str) -> String {
    token.trim_end_matches('.').to_ascii_lowercase()
}

/// Keyword and position based tagger for US street addresses.
///
/// The first comma-separated segment holds the delivery line; later segments
/// hold the place name followed by state and ZIP. A label that recurs after a
/// different label has intervened makes the parse ambiguous and is reported
/// as [`TagError::RepeatedLabel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedTagger;

impl RuleBasedTagger {
    fn tag_delivery_line(&self, segment: &str, tokens: &mut Vec<(String, AddressLabel)>) {
        let words: Vec<&str> = segment.split_whitespace().collect();
        let mut index = 0;
        // Label for the word after an occupancy or building keyword.
        let mut pending_identifier: Option<AddressLabel> = None;
        let mut seen_street_name = false;

        while index < words.len() {
            let word = words[index];
            let lowered = keyword(word);

            let label = if let Some(identifier) = pending_identifier.take() {
                identifier
            } else if lowered == "po" || lowered == "p.o" {
                if words
                    .get(index + 1)
                    .is_some_and(|next| keyword(next) == "box")
                {
                    tokens.push((word.to_string(), AddressLabel::UspsBoxType));
                    index += 1;
                    tokens.push((words[index].to_string(), AddressLabel::UspsBoxType));
                    if let Some(id) = words.get(index + 1) {
                        index += 1;
                        tokens.push((id.to_string(), AddressLabel::UspsBoxId));
                    }
                    index += 1;
                    continue;
                }
                AddressLabel::StreetName
            } else if let Some(rest) = word.strip_prefix('#').filter(|rest| !rest.is_empty()) {
                tokens.push(("#".to_string(), AddressLabel::OccupancyType));
                tokens.push((rest.to_string(), AddressLabel::OccupancyIdentifier));
                index += 1;
                continue;
            } else if OCCUPANCY_KEYWORDS.contains(&lowered.as_str()) {
                pending_identifier = Some(AddressLabel::OccupancyIdentifier);
                AddressLabel::OccupancyType
            } else if BUILDING_KEYWORDS.contains(&lowered.as_str()) {
                pending_identifier = Some(AddressLabel::BuildingName);
                AddressLabel::BuildingName
            } else if index == 0 && word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                AddressLabel::AddressNumber
            } else if DIRECTIONALS.contains(&lowered.as_str()) {
                if seen_street_name {
                    AddressLabel::StreetNamePostDirectional
                } else {
                    AddressLabel::StreetNamePreDirectional
                }
            } else if seen_street_name && STREET_TYPES.contains(&lowered.as_str()) {
                AddressLabel::StreetNamePostType
            } else {
                seen_street_name = true;
                AddressLabel::StreetName
            };

            tokens.push((word.to_string(), label));
            index += 1;
        }
    }

    fn tag_locality(&self, segment: &str, is_last: bool, tokens: &mut Vec<(String, AddressLabel)>) {
        let words: Vec<&str> = segment.split_whitespace().collect();
        let mut place_end = words.len();

        if is_last {
            if place_end > 0 && zip_pattern().is_match(words[place_end - 1]) {
                place_end -= 1;
            }
            if place_end > 0 && state_pattern().is_match(words[place_end - 1]) {
                place_end -= 1;
            }
        }

        for (position, word) in words.iter().enumerate() {
            let label = if position < place_end {
                if zip_pattern().is_match(word) {
                    AddressLabel::ZipCode
                } else {
                    AddressLabel::PlaceName
                }
            } else if zip_pattern().is_match(word) {
                AddressLabel::ZipCode
            } else {
                AddressLabel::StateName
            };
            tokens.push((word.to_string(), label));
        }
    }
}

impl AddressTagger for RuleBasedTagger {
    fn tag(&self, text: &str) -> Result<TaggedAddress, TagError> {
        let segments: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((delivery, locality)) = segments.split_first() else {
            return Err(TagError::Empty);
        };

        let mut tokens = Vec::new();
        self.tag_delivery_line(delivery, &mut tokens);
        for (position, segment) in locality.iter().enumerate() {
            self.tag_locality(segment, position + 1 == locality.len(), &mut tokens);
        }

        ensure_contiguous_labels(text, &tokens)?;

        let classification = if tokens
            .iter()
            .any(|(_, label)| *label == AddressLabel::UspsBoxId)
        {
            AddressClassification::PoBox
        } else if tokens
            .iter()
            .any(|(_, label)| *label == AddressLabel::AddressNumber)
        {
            AddressClassification::StreetAddress
        } else {
            AddressClassification::Ambiguous
        };

        Ok(TaggedAddress {
            tokens,
            classification,
        })
    }
}

fn ensure_contiguous_labels(
    input: &str,
    tokens: &[(String, AddressLabel)],
) -> Result<(), TagError> {
    let mut closed: Vec<AddressLabel> = Vec::new();
    let mut current: Option<AddressLabel> = None;

    for (_, label) in tokens {
        if current == Some(*label) {
            continue;
        }
        if closed.contains(label) {
            return Err(TagError::RepeatedLabel {
                label: *label,
                input: input.to_string(),
            });
        }
        if let Some(previous) = current {
            closed.push(previous);
        }
        current = Some(*label);
    }

    Ok(())
}
