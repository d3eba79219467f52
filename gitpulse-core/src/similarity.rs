//! Normalized string-distance catalog
//!
//! A fixed set of measures applied to (old, new) text pairs: edit-distance
//! and LCS measures over characters, and shingle-profile measures at
//! arities 2 through 6. Every measure returns a distance in [0, 1].
//!
//! The catalog is a static registry: each measurement type maps to a boxed
//! measure constructor, with the shingle arity baked into the type. There
//! is no runtime discovery.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Similarity threshold above which the Winkler prefix bonus applies
const WINKLER_THRESHOLD: f64 = 0.7;
/// Winkler prefix scaling factor
const WINKLER_PREFIX_SCALE: f64 = 0.1;
/// Maximum common-prefix length considered by the Winkler bonus
const WINKLER_MAX_PREFIX: usize = 4;

/// Every supported measurement, shingle arity included in the type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    /// Sentinel: no similarity computed, distance always 0
    None,
    NormalizedLevenshtein,
    JaroWinkler,
    MetricLongestCommonSubsequence,
    NGram2,
    NGram3,
    NGram4,
    NGram5,
    NGram6,
    Cosine2,
    Cosine3,
    Cosine4,
    Cosine5,
    Cosine6,
    Jaccard2,
    Jaccard3,
    Jaccard4,
    Jaccard5,
    Jaccard6,
    SorensenDice2,
    SorensenDice3,
    SorensenDice4,
    SorensenDice5,
    SorensenDice6,
}

impl MeasurementType {
    /// Every type, sentinel first
    pub const ALL: [MeasurementType; 24] = [
        MeasurementType::None,
        MeasurementType::NormalizedLevenshtein,
        MeasurementType::JaroWinkler,
        MeasurementType::MetricLongestCommonSubsequence,
        MeasurementType::NGram2,
        MeasurementType::NGram3,
        MeasurementType::NGram4,
        MeasurementType::NGram5,
        MeasurementType::NGram6,
        MeasurementType::Cosine2,
        MeasurementType::Cosine3,
        MeasurementType::Cosine4,
        MeasurementType::Cosine5,
        MeasurementType::Cosine6,
        MeasurementType::Jaccard2,
        MeasurementType::Jaccard3,
        MeasurementType::Jaccard4,
        MeasurementType::Jaccard5,
        MeasurementType::Jaccard6,
        MeasurementType::SorensenDice2,
        MeasurementType::SorensenDice3,
        MeasurementType::SorensenDice4,
        MeasurementType::SorensenDice5,
        MeasurementType::SorensenDice6,
    ];

    /// The catalog of real measures (everything but the sentinel)
    pub fn catalog() -> impl Iterator<Item = MeasurementType> {
        Self::ALL
            .into_iter()
            .filter(|t| *t != MeasurementType::None)
    }

    /// Shingle arity for profile-based measures
    pub fn shingle_size(self) -> Option<usize> {
        use MeasurementType::*;
        match self {
            NGram2 | Cosine2 | Jaccard2 | SorensenDice2 => Some(2),
            NGram3 | Cosine3 | Jaccard3 | SorensenDice3 => Some(3),
            NGram4 | Cosine4 | Jaccard4 | SorensenDice4 => Some(4),
            NGram5 | Cosine5 | Jaccard5 | SorensenDice5 => Some(5),
            NGram6 | Cosine6 | Jaccard6 | SorensenDice6 => Some(6),
            _ => Option::None,
        }
    }

    /// Construct the measure behind this type; the sentinel has none
    pub fn measure(self) -> Option<Box<dyn Measure>> {
        use MeasurementType::*;
        let boxed: Box<dyn Measure> = match self {
            None => return Option::None,
            NormalizedLevenshtein => Box::new(NormalizedLevenshteinMeasure),
            JaroWinkler => Box::new(JaroWinklerMeasure),
            MetricLongestCommonSubsequence => Box::new(MetricLcsMeasure),
            NGram2 | NGram3 | NGram4 | NGram5 | NGram6 => Box::new(NGramMeasure {
                n: self.shingle_size().unwrap_or(2),
            }),
            Cosine2 | Cosine3 | Cosine4 | Cosine5 | Cosine6 => Box::new(CosineMeasure {
                k: self.shingle_size().unwrap_or(2),
            }),
            Jaccard2 | Jaccard3 | Jaccard4 | Jaccard5 | Jaccard6 => Box::new(JaccardMeasure {
                k: self.shingle_size().unwrap_or(2),
            }),
            SorensenDice2 | SorensenDice3 | SorensenDice4 | SorensenDice5 | SorensenDice6 => {
                Box::new(SorensenDiceMeasure {
                    k: self.shingle_size().unwrap_or(2),
                })
            }
        };
        Some(boxed)
    }
}

/// A normalized string distance in [0, 1]
pub trait Measure: Send + Sync {
    fn distance(&self, a: &str, b: &str) -> f64;
}

/// Distance under one measurement type with the shared edge rules applied:
/// equal inputs are 0, a single empty side is 1, the sentinel is always 0.
pub fn distance(ty: MeasurementType, a: &str, b: &str) -> f64 {
    let Some(measure) = ty.measure() else {
        return 0.0;
    };
    if a == b {
        return 0.0;
    }
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    measure.distance(a, b).clamp(0.0, 1.0)
}

/// Distances for one (old, new) pair under one measurement type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimilarityRecord {
    pub measurement: MeasurementType,
    pub distance: f64,
    pub distance_no_comments: f64,
}

impl SimilarityRecord {
    /// Aggregation weight of the raw variant (1 − distance)
    pub fn weight(&self) -> f64 {
        1.0 - self.distance
    }

    /// Aggregation weight of the comments-stripped variant
    pub fn weight_no_comments(&self) -> f64 {
        1.0 - self.distance_no_comments
    }
}

/// Apply the enabled measurements to one (old, new) pair, in both the raw
/// and the comments-stripped variant.
pub fn compare(
    enabled: &[MeasurementType],
    old_text: &str,
    new_text: &str,
    old_no_comments: &str,
    new_no_comments: &str,
) -> Vec<SimilarityRecord> {
    enabled
        .iter()
        .map(|&measurement| SimilarityRecord {
            measurement,
            distance: distance(measurement, old_text, new_text),
            distance_no_comments: distance(measurement, old_no_comments, new_no_comments),
        })
        .collect()
}

struct NormalizedLevenshteinMeasure;

impl Measure for NormalizedLevenshteinMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let max_len = a.len().max(b.len());
        if max_len == 0 {
            return 0.0;
        }
        levenshtein(&a, &b) as f64 / max_len as f64
    }
}

/// Plain Levenshtein edit distance, two-row DP
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            curr[j + 1] = sub.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

struct JaroWinklerMeasure;

impl Measure for JaroWinklerMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        1.0 - jaro_winkler(&a, &b)
    }
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }
    let window = (long.len() / 2).saturating_sub(1);

    let mut long_taken = vec![false; long.len()];
    let mut short_matches: Vec<char> = Vec::new();
    let mut long_matches: Vec<char> = Vec::new();

    for (i, &c) in short.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(long.len());
        for j in lo..hi {
            if !long_taken[j] && long[j] == c {
                long_taken[j] = true;
                short_matches.push(c);
                break;
            }
        }
    }
    for (j, taken) in long_taken.iter().enumerate() {
        if *taken {
            long_matches.push(long[j]);
        }
    }

    let matches = short_matches.len();
    if matches == 0 {
        return 0.0;
    }
    let half_transpositions = short_matches
        .iter()
        .zip(long_matches.iter())
        .filter(|(s, l)| s != l)
        .count();
    let transpositions = half_transpositions as f64 / 2.0;
    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions) / m) / 3.0
}

fn jaro_winkler(a: &[char], b: &[char]) -> f64 {
    let base = jaro(a, b);
    if base <= WINKLER_THRESHOLD {
        return base;
    }
    let prefix = a
        .iter()
        .zip(b.iter())
        .take(WINKLER_MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();
    base + prefix as f64 * WINKLER_PREFIX_SCALE * (1.0 - base)
}

struct MetricLcsMeasure;

impl Measure for MetricLcsMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let max_len = a.len().max(b.len());
        if max_len == 0 {
            return 0.0;
        }
        1.0 - lcs_length(&a, &b) as f64 / max_len as f64
    }
}

/// Longest-common-subsequence length, two-row DP
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = vec![0; b.len() + 1];
    let mut curr: Vec<usize> = vec![0; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Kondrak n-gram distance with affixing padding
struct NGramMeasure {
    n: usize,
}

impl Measure for NGramMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        const SPECIAL: char = '\n';
        let n = self.n;
        let s: Vec<char> = a.chars().collect();
        let t: Vec<char> = b.chars().collect();
        let (sl, tl) = (s.len(), t.len());

        if sl < n || tl < n {
            let matching = s
                .iter()
                .zip(t.iter())
                .filter(|(x, y)| x == y)
                .count();
            return 1.0 - matching as f64 / sl.max(tl) as f64;
        }

        // s padded with n-1 leading specials
        let mut sa = vec![SPECIAL; sl + n - 1];
        sa[n - 1..].copy_from_slice(&s);

        let mut prev: Vec<f64> = (0..=sl).map(|i| i as f64).collect();
        let mut curr: Vec<f64> = vec![0.0; sl + 1];
        let mut t_gram = vec![SPECIAL; n];

        for j in 1..=tl {
            if j < n {
                for slot in t_gram.iter_mut().take(n - j) {
                    *slot = SPECIAL;
                }
                t_gram[n - j..].copy_from_slice(&t[..j]);
            } else {
                t_gram.copy_from_slice(&t[j - n..j]);
            }

            curr[0] = j as f64;
            for i in 1..=sl {
                let mut cost = 0usize;
                let mut effective = n;
                for ni in 0..n {
                    if sa[i - 1 + ni] != t_gram[ni] {
                        cost += 1;
                    } else if sa[i - 1 + ni] == SPECIAL {
                        // matches on the padding prefix don't count
                        effective -= 1;
                    }
                }
                let edit = if effective == 0 {
                    0.0
                } else {
                    cost as f64 / effective as f64
                };
                curr[i] = (curr[i - 1] + 1.0)
                    .min(prev[i] + 1.0)
                    .min(prev[i - 1] + edit);
            }
            std::mem::swap(&mut prev, &mut curr);
        }
        prev[sl] / sl.max(tl) as f64
    }
}

/// k-shingle profile: counts of contiguous k-char substrings after
/// collapsing whitespace runs to single spaces
fn shingle_profile(s: &str, k: usize) -> HashMap<String, u32> {
    let normalized = whitespace_re().replace_all(s, " ");
    let chars: Vec<char> = normalized.chars().collect();
    let mut profile = HashMap::new();
    if chars.len() >= k {
        for window in chars.windows(k) {
            *profile
                .entry(window.iter().collect::<String>())
                .or_insert(0u32) += 1;
        }
    }
    profile
}

struct CosineMeasure {
    k: usize,
}

impl Measure for CosineMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let pa = shingle_profile(a, self.k);
        let pb = shingle_profile(b, self.k);
        if pa.is_empty() || pb.is_empty() {
            return 1.0;
        }
        let dot: f64 = pa
            .iter()
            .filter_map(|(key, &ca)| pb.get(key).map(|&cb| f64::from(ca) * f64::from(cb)))
            .sum();
        let norm = |p: &HashMap<String, u32>| {
            p.values()
                .map(|&c| f64::from(c) * f64::from(c))
                .sum::<f64>()
                .sqrt()
        };
        1.0 - dot / (norm(&pa) * norm(&pb))
    }
}

struct JaccardMeasure {
    k: usize,
}

impl Measure for JaccardMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let pa = shingle_profile(a, self.k);
        let pb = shingle_profile(b, self.k);
        if pa.is_empty() || pb.is_empty() {
            return 1.0;
        }
        let intersection = pa.keys().filter(|key| pb.contains_key(*key)).count();
        let union = pa.len() + pb.len() - intersection;
        1.0 - intersection as f64 / union as f64
    }
}

struct SorensenDiceMeasure {
    k: usize,
}

impl Measure for SorensenDiceMeasure {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let pa = shingle_profile(a, self.k);
        let pb = shingle_profile(b, self.k);
        if pa.is_empty() || pb.is_empty() {
            return 1.0;
        }
        let intersection = pa.keys().filter(|key| pb.contains_key(*key)).count();
        1.0 - 2.0 * intersection as f64 / (pa.len() + pb.len()) as f64
    }
}
