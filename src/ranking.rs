//! Zipping the ranking backend's parallel arrays into display rows, and the
//! navigation state built when a row is picked.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::{Result, SchoolMatchError};
use crate::models::RankingResponse;
use crate::query::{format_number, query_pairs};

/// One row of the ranking table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSchool {
    /// 1-based position in the backend's order
    pub rank: u32,
    pub name: String,
    pub similarity: f64,
    pub image_url: String,
}

/// Zip the three parallel arrays. Any missing array or length mismatch gives
/// an empty ranking; order is the backend's, never re-sorted.
pub fn assemble_ranking(
    names: Option<&[String]>,
    similarities: Option<&[f64]>,
    image_urls: Option<&[String]>,
) -> Vec<RankedSchool> {
    let (Some(names), Some(similarities), Some(image_urls)) = (names, similarities, image_urls)
    else {
        return Vec::new();
    };
    if names.len() != similarities.len() || names.len() != image_urls.len() {
        tracing::warn!(
            names = names.len(),
            similarities = similarities.len(),
            image_urls = image_urls.len(),
            "ranking arrays differ in length, discarding"
        );
        return Vec::new();
    }

    names
        .iter()
        .zip(similarities)
        .zip(image_urls)
        .enumerate()
        .map(|(i, ((name, similarity), image_url))| RankedSchool {
            rank: i as u32 + 1,
            name: name.clone(),
            similarity: *similarity,
            image_url: image_url.clone(),
        })
        .collect()
}

impl RankingResponse {
    pub fn ranked(&self) -> Vec<RankedSchool> {
        assemble_ranking(
            self.schools.as_deref(),
            self.similarities.as_deref(),
            self.school_image_urls.as_deref(),
        )
    }
}

/// Rank badge style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Outline,
}

pub fn badge_variant(rank: u32) -> BadgeVariant {
    match rank {
        1 => BadgeVariant::Default,
        2 => BadgeVariant::Secondary,
        _ => BadgeVariant::Outline,
    }
}

/// Similarity as a percentage with two decimals, e.g. `90.00%`.
pub fn format_similarity(similarity: f64) -> String {
    format!("{:.2}%", similarity * 100.0)
}

// Characters left alone by the browser's `encodeURIComponent`
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Target of the per-school chat page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoute {
    pub school: String,
    pub query: String,
}

impl ChatRoute {
    /// `/chat/{urlEncodedSchoolName}?{query}`
    pub fn path(&self) -> String {
        format!("/chat/{}?{}", utf8_percent_encode(&self.school, PATH_SEGMENT), self.query)
    }

    /// Inverse of [`ChatRoute::path`].
    pub fn parse(path: &str) -> Result<Self> {
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let segment = route
            .strip_prefix("/chat/")
            .filter(|s| !s.is_empty() && !s.contains('/'))
            .ok_or_else(|| SchoolMatchError::MissingInput(format!("Not a chat route: {path}")))?;
        let school = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|e| SchoolMatchError::MissingInput(format!("Invalid school name: {e}")))?
            .into_owned();
        Ok(Self {
            school,
            query: query.to_string(),
        })
    }
}

/// Navigation state for a clicked row: the current query string with
/// `similarity` and `imageUrl` overwritten by the row's values.
pub fn select_school(school: &RankedSchool, current_query: &str) -> ChatRoute {
    let mut pairs = query_pairs(current_query);
    set_param(&mut pairs, "similarity", format_number(school.similarity));
    set_param(&mut pairs, "imageUrl", school.image_url.clone());

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();

    tracing::info!(school = %school.name, rank = school.rank, "school selected");
    ChatRoute {
        school: school.name.clone(),
        query,
    }
}

// Replace the first `key` in place and drop later duplicates, or append.
fn set_param(pairs: &mut Vec<(String, String)>, key: &str, value: String) {
    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value;
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = index <= first || k != key;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value)),
    }
}
