//! Naming-independent episode identity.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::provider::Show;

// All patterns run on folded text: lower-case ASCII letters, digits, single spaces.
static VERBOSE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:saison|season|series) ?(\d{1,3}) ?(?:episode|ep) ?(\d{1,4})\b").unwrap()
});
static SXE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bs(\d{1,3}) ?e(\d{1,4})\b").unwrap());
static NXN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})x(\d{1,3})\b").unwrap());
static EPISODE_ONLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:episode|ep) ?(\d{1,4})\b").unwrap());

/// Season/episode numbering of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeNumber {
    pub season: Option<u32>,
    pub episode: u32,
}

impl EpisodeNumber {
    fn key_fragment(&self) -> String {
        match self.season {
            Some(season) => format!("s{:02}e{:03}", season, self.episode),
            None => format!("e{:03}", self.episode),
        }
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.season {
            Some(season) => write!(f, "S{:02}E{:02}", season, self.episode),
            None => write!(f, "E{:02}", self.episode),
        }
    }
}

/// Identity of a logical episode, stable across providers and formatting.
///
/// Built from the folded series name and the episode numbering. When a show
/// carries no numbering, the folded episode title, then the air date, then
/// the provider identity are used instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn for_show(show: &Show) -> Self {
        let title = strip_episode_tokens(&fold(&show.title));
        // Numbering is only read from the series name when the title is empty.
        let mut base = if title.is_empty() {
            strip_episode_tokens(&fold(&show.show))
        } else {
            fold(&show.show)
        };
        if base.is_empty() {
            base = title.clone();
        }

        let discriminator = match show.episode_number() {
            Some(number) => number.key_fragment(),
            None if !title.is_empty() && title != base => title,
            None => match show.aired_at {
                Some(aired_at) => aired_at.format("%Y-%m-%d").to_string(),
                None => format!("{}:{}", show.provider, show.id),
            },
        };

        Self(format!("{}|{}", base, discriminator))
    }

    /// Wrap a key read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, fold accented Latin letters to ASCII and collapse everything
/// that is not a letter or digit into single spaces.
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match fold_char(c) {
            Some(ascii) => out.push_str(ascii),
            None if c.is_alphanumeric() => out.push(c),
            None => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' | 'ľ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Find season/episode numbering in free text (`S01E02`, `1x02`,
/// `Saison 1 Épisode 2`, `Episode 2`).
pub fn parse_episode_number(text: &str) -> Option<EpisodeNumber> {
    let folded = fold(text);

    for pattern in [&*VERBOSE_PATTERN, &*SXE_PATTERN, &*NXN_PATTERN] {
        if let Some(caps) = pattern.captures(&folded) {
            let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
            if let (Some(season), Some(episode)) = (season, episode) {
                return Some(EpisodeNumber {
                    season: Some(season),
                    episode,
                });
            }
        }
    }

    EPISODE_ONLY_PATTERN
        .captures(&folded)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .map(|episode| EpisodeNumber {
            season: None,
            episode,
        })
}

/// Remove numbering tokens from folded text.
pub(crate) fn strip_episode_tokens(folded: &str) -> String {
    let mut text = folded.to_string();
    for pattern in [
        &*VERBOSE_PATTERN,
        &*SXE_PATTERN,
        &*NXN_PATTERN,
        &*EPISODE_ONLY_PATTERN,
    ] {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_fold_accents_and_punctuation() {
        assert_eq!(fold("Les Lapins Crétins"), "les lapins cretins");
        assert_eq!(fold("C'est pas sorcier !"), "c est pas sorcier");
        assert_eq!(fold("  Œuvre   Ça-Alors "), "oeuvre ca alors");
        assert_eq!(fold("Straße"), "strasse");
    }

    #[test]
    fn test_parse_sxe() {
        let n = parse_episode_number("Les Lapins Crétins S01E02").unwrap();
        assert_eq!(n, EpisodeNumber { season: Some(1), episode: 2 });

        let n = parse_episode_number("show s3 e12 final").unwrap();
        assert_eq!(n, EpisodeNumber { season: Some(3), episode: 12 });
    }

    #[test]
    fn test_parse_nxn() {
        let n = parse_episode_number("Kaamelott 2x15").unwrap();
        assert_eq!(n, EpisodeNumber { season: Some(2), episode: 15 });
    }

    #[test]
    fn test_parse_verbose_french() {
        let n = parse_episode_number("Saison 4, épisode 7").unwrap();
        assert_eq!(n, EpisodeNumber { season: Some(4), episode: 7 });
    }

    #[test]
    fn test_parse_episode_only() {
        let n = parse_episode_number("Épisode 31 - Le retour").unwrap();
        assert_eq!(n, EpisodeNumber { season: None, episode: 31 });
    }

    #[test]
    fn test_parse_ignores_bare_letter_e() {
        assert!(parse_episode_number("Vitamine E 12").is_none());
        assert!(parse_episode_number("E12").is_none());
        let n = parse_episode_number("Ep 12").unwrap();
        assert_eq!(n, EpisodeNumber { season: None, episode: 12 });
    }

    #[test]
    fn test_parse_none() {
        assert!(parse_episode_number("Le journal de 20h").is_none());
        assert!(parse_episode_number("").is_none());
    }

    #[test]
    fn test_key_ignores_formatting_differences() {
        let a = Show::new("x", "1", "Les Lapins Crétins S01E01", "");
        let b = Show::new("x", "2", "Les Lapins Cretins S01E01", "");
        let c = Show::new("y", "zz", "LES LAPINS CRÉTINS", "1x01 - Le grand saut");
        let d = Show::new("y", "zz", "Les lapins crétins", "Saison 1 Épisode 1")
            .with_pitch("ignored");

        assert_eq!(a.match_key(), b.match_key());
        assert_eq!(a.match_key(), c.match_key());
        assert_eq!(a.match_key(), d.match_key());
        assert_eq!(a.match_key().as_str(), "les lapins cretins|s01e001");
    }

    #[test]
    fn test_key_distinguishes_episodes() {
        let a = Show::new("x", "1", "Les Lapins Crétins", "S01E01");
        let b = Show::new("x", "2", "Les Lapins Crétins", "S01E02");
        let c = Show::new("x", "3", "Les Lapins Crétins", "S02E01");
        assert_ne!(a.match_key(), b.match_key());
        assert_ne!(a.match_key(), c.match_key());
    }

    #[test]
    fn test_numbers_in_series_name_do_not_merge_episodes() {
        let a = Show::new("x", "1", "Vitamine E 12 - Le magazine", "Le retour");
        let b = Show::new("x", "2", "Vitamine E 12 - Le magazine", "Les vacances");
        assert_ne!(a.match_key(), b.match_key());
        assert!(a.episode_number().is_none());

        let c = Show::new("x", "3", "4x4 Magazine", "Les pick-up");
        let d = Show::new("x", "4", "4x4 Magazine", "Le Dakar");
        assert_ne!(c.match_key(), d.match_key());
        assert_eq!(c.match_key().as_str(), "4x4 magazine|les pick up");
    }

    #[test]
    fn test_title_numbering_wins_over_series_name() {
        let a = Show::new("x", "1", "4x4 Magazine", "S02E05 - Le Dakar");
        let n = a.episode_number().unwrap();
        assert_eq!(n, EpisodeNumber { season: Some(2), episode: 5 });
        assert_eq!(a.match_key().as_str(), "4x4 magazine|s02e005");
    }

    #[test]
    fn test_key_falls_back_to_title() {
        let a = Show::new("x", "1", "Karambolage", "Le Croissant");
        let b = Show::new("y", "77", "karambolage", "le croissant !");
        assert_eq!(a.match_key(), b.match_key());
        assert_eq!(a.match_key().as_str(), "karambolage|le croissant");
    }

    #[test]
    fn test_key_falls_back_to_air_date_then_identity() {
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        let a = Show::new("x", "1", "Le Journal", "").with_aired_at(day);
        assert_eq!(a.match_key().as_str(), "le journal|2024-05-01");

        let b = Show::new("x", "1", "Le Journal", "");
        assert_eq!(b.match_key().as_str(), "le journal|x:1");
    }

    #[test]
    fn test_episode_number_display() {
        let n = EpisodeNumber { season: Some(1), episode: 2 };
        assert_eq!(n.to_string(), "S01E02");
        let n = EpisodeNumber { season: None, episode: 120 };
        assert_eq!(n.to_string(), "E120");
    }
}
