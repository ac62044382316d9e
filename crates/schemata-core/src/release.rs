//! Release synchronisation.
//!
//! Managed records remember the release tag that last wrote them. The oldest
//! of those tags is the watermark from which the release feed is asked for
//! newer releases. Tags are compared as semantic versions, never as strings:
//! `v1.10.0` is newer than `v1.2.0`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt as _};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::record::SchemaRecord;

// ─── Types ───────────────────────────────────────────────────────────────────

/// A published bundle of managed schema definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
  pub tag:          String,
  /// Where the release's manifest can be fetched from.
  pub manifest_url: String,
  #[serde(default)]
  pub published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes:        Option<String>,
}

/// One schema definition inside a release manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
  /// The release this entry claims to belong to.
  pub release: String,
  /// Log-type name the entry defines.
  pub name:    String,
  /// Raw schema definition text.
  pub spec:    String,
}

// ─── Version helpers ─────────────────────────────────────────────────────────

/// Parse a release tag, with or without a leading `v`.
pub fn parse_release(tag: &str) -> Option<Version> {
  let bare = tag.strip_prefix('v').unwrap_or(tag);
  Version::parse(bare).ok()
}

/// Order two tags semantically. Unparseable tags sort before every valid one.
pub fn compare_releases(a: &str, b: &str) -> Ordering {
  parse_release(a).cmp(&parse_release(b))
}

// ─── Watermark ───────────────────────────────────────────────────────────────

/// Fold a record stream into the earliest release applied to any managed
/// record. Records without a valid semver release are ignored.
pub async fn min_applied_release<St, E>(records: St) -> Result<Option<String>, E>
where
  St: Stream<Item = Result<SchemaRecord, E>>,
{
  records
    .try_fold(None::<(Version, String)>, |min, record| async move {
      if !record.is_managed() {
        return Ok(min);
      }
      let (Some(version), Some(tag)) = (record.release_version(), record.release)
      else {
        return Ok(min);
      };
      let keep = matches!(&min, Some((current, _)) if *current <= version);
      Ok(if keep { min } else { Some((version, tag)) })
    })
    .await
    .map(|min| min.map(|(_, tag)| tag))
}

/// Keep releases strictly newer than `since`, oldest first.
pub fn newer_than(since: Option<&str>, mut releases: Vec<Release>) -> Vec<Release> {
  let floor = since.and_then(parse_release);
  releases.retain(|r| match (parse_release(&r.tag), &floor) {
    (Some(v), Some(floor)) => v > *floor,
    (Some(_), None) => true,
    (None, _) => false,
  });
  releases.sort_by(|a, b| compare_releases(&a.tag, &b.tag));
  releases
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use futures::stream;

  use super::*;
  use crate::testing::{managed_record, record};

  fn feed(tags: &[&str]) -> Vec<Release> {
    tags
      .iter()
      .map(|t| Release {
        tag:          (*t).to_owned(),
        manifest_url: format!("https://releases.example.com/{t}.json"),
        published_at: None,
        notes:        None,
      })
      .collect()
  }

  #[tokio::test]
  async fn min_release_is_semantic_not_lexical() {
    let records = vec![
      managed_record("AWS.A", "v1.2.0"),
      managed_record("AWS.B", "v1.10.0"),
      managed_record("AWS.C", "v1.3.0"),
    ];
    let min = min_applied_release(stream::iter(
      records.into_iter().map(Ok::<_, Infallible>),
    ))
    .await
    .unwrap();
    assert_eq!(min.as_deref(), Some("v1.2.0"));
  }

  #[tokio::test]
  async fn min_release_ignores_user_and_invalid_records() {
    let mut bogus = managed_record("AWS.Bogus", "v0.0.1");
    bogus.release = Some("nightly".into());
    let records = vec![
      record("Custom.Foo", 3, false),
      bogus,
      managed_record("AWS.A", "v2.0.0"),
    ];
    let min = min_applied_release(stream::iter(
      records.into_iter().map(Ok::<_, Infallible>),
    ))
    .await
    .unwrap();
    assert_eq!(min.as_deref(), Some("v2.0.0"));
  }

  #[tokio::test]
  async fn min_release_absent_without_managed_records() {
    let records = vec![record("Custom.Foo", 1, false)];
    let min = min_applied_release(stream::iter(
      records.into_iter().map(Ok::<_, Infallible>),
    ))
    .await
    .unwrap();
    assert!(min.is_none());
  }

  #[test]
  fn tags_parse_with_or_without_prefix() {
    assert_eq!(parse_release("v1.2.3"), parse_release("1.2.3"));
    assert!(parse_release("v1.2").is_none());
    assert_eq!(compare_releases("v1.10.0", "v1.9.9"), Ordering::Greater);
  }

  #[test]
  fn newer_than_filters_and_sorts() {
    let releases = feed(&["v1.10.0", "v1.2.0", "v1.3.0", "garbage"]);
    let tags: Vec<_> = newer_than(Some("v1.2.0"), releases)
      .into_iter()
      .map(|r| r.tag)
      .collect();
    assert_eq!(tags, ["v1.3.0", "v1.10.0"]);
  }

  #[test]
  fn newer_than_without_watermark_keeps_all_valid() {
    let releases = feed(&["v0.2.0", "v0.1.0"]);
    let tags: Vec<_> =
      newer_than(None, releases).into_iter().map(|r| r.tag).collect();
    assert_eq!(tags, ["v0.1.0", "v0.2.0"]);
  }
}
