//! Role-scoped record queries: filtering, stable ordering, pagination.

use serde::{Deserialize, Serialize};

use crate::access::{can_view, Session};
use crate::record::AchievementRecord;
use crate::status::Status;

/// Narrowing filters for a record listing. All fields are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    pub status: Option<Status>,
    pub owner_id: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
}

impl RecordFilter {
    fn matches(&self, record: &AchievementRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(ref owner_id) = self.owner_id {
            if &record.owner_id != owner_id {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(ref needle) = self.title_contains {
            if !record
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// One page of a stable-ordered listing. `total` counts every visible
/// matching record, not just this page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

/// Produce one page of the records the session may view, narrowed by the
/// filter.
///
/// Ordering is by submission time descending (records never submitted sort
/// by creation time in the same key), ties broken by id ascending. The
/// timestamp format is fixed-width UTC, so the lexicographic comparison is
/// chronological. Because the sort is total, no record is ever skipped or
/// duplicated across pages.
///
/// `page` is 1-based; page 0 is treated as page 1.
pub fn page_records(
    records: &[AchievementRecord],
    session: &Session,
    filter: &RecordFilter,
    page: usize,
    page_size: usize,
) -> Page<AchievementRecord> {
    let mut visible: Vec<&AchievementRecord> = records
        .iter()
        .filter(|r| can_view(session, r) && filter.matches(r))
        .collect();

    visible.sort_by(|a, b| {
        sort_key(b)
            .cmp(sort_key(a))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = visible.len();
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size);
    let items = visible
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    Page {
        items,
        page,
        page_size,
        total,
    }
}

fn sort_key(record: &AchievementRecord) -> &str {
    record
        .submitted_at
        .as_deref()
        .unwrap_or(&record.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Capability;

    fn record(id: &str, owner: &str, submitted_at: Option<&str>) -> AchievementRecord {
        let mut rec = AchievementRecord::new_draft(
            id.to_string(),
            owner.to_string(),
            format!("Project {}", id),
            "science".to_string(),
            vec![],
            "2026-01-01T00:00:00Z".to_string(),
        );
        if let Some(ts) = submitted_at {
            rec.status = Status::Pending;
            rec.submitted_at = Some(ts.to_string());
        }
        rec
    }

    fn reviewer() -> Session {
        Session::new("teacher-1", &[Capability::Reviewer])
    }

    #[test]
    fn owner_scope_hides_other_students_records() {
        let records = vec![
            record("a", "student-1", Some("2026-02-01T10:00:00Z")),
            record("b", "student-2", Some("2026-02-01T11:00:00Z")),
        ];
        let session = Session::new("student-1", &[]);
        let page = page_records(&records, &session, &RecordFilter::default(), 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "a");
    }

    #[test]
    fn reviewer_sees_everything_newest_first() {
        let records = vec![
            record("a", "student-1", Some("2026-02-01T10:00:00Z")),
            record("b", "student-2", Some("2026-02-03T10:00:00Z")),
            record("c", "student-3", Some("2026-02-02T10:00:00Z")),
        ];
        let page = page_records(&records, &reviewer(), &RecordFilter::default(), 1, 10);
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_timestamps_break_ties_by_id_ascending() {
        let ts = Some("2026-02-01T10:00:00Z");
        let records = vec![
            record("c", "s", ts),
            record("a", "s", ts),
            record("b", "s", ts),
        ];
        let page = page_records(&records, &reviewer(), &RecordFilter::default(), 1, 10);
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn drafts_sort_by_creation_time() {
        let mut draft = record("d", "s", None);
        draft.created_at = "2026-02-02T00:00:00Z".to_string();
        let records = vec![
            record("a", "s", Some("2026-02-01T10:00:00Z")),
            draft,
            record("b", "s", Some("2026-02-03T10:00:00Z")),
        ];
        let page = page_records(&records, &reviewer(), &RecordFilter::default(), 1, 10);
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn pagination_covers_all_records_without_repeats() {
        // 25 records, page size 10: expect 10 + 10 + 5 with no id repeated.
        let records: Vec<AchievementRecord> = (0..25)
            .map(|i| {
                record(
                    &format!("ach-{:02}", i),
                    "s",
                    Some(&format!("2026-02-01T10:{:02}:00Z", i)),
                )
            })
            .collect();

        let mut seen = std::collections::BTreeSet::new();
        let mut sizes = Vec::new();
        for page_no in 1..=3 {
            let page = page_records(&records, &reviewer(), &RecordFilter::default(), page_no, 10);
            assert_eq!(page.total, 25);
            sizes.push(page.items.len());
            for item in &page.items {
                assert!(seen.insert(item.id.clone()), "duplicate id {}", item.id);
            }
        }
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn page_past_the_end_is_empty_but_reports_total() {
        let records = vec![record("a", "s", Some("2026-02-01T10:00:00Z"))];
        let page = page_records(&records, &reviewer(), &RecordFilter::default(), 5, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn filters_narrow_conjunctively() {
        let mut a = record("a", "student-1", Some("2026-02-01T10:00:00Z"));
        a.category = "art".to_string();
        a.title = "Watercolor study".to_string();
        let b = record("b", "student-1", Some("2026-02-01T11:00:00Z"));
        let mut c = record("c", "student-2", Some("2026-02-01T12:00:00Z"));
        c.category = "art".to_string();
        let records = vec![a, b, c];

        let filter = RecordFilter {
            category: Some("art".to_string()),
            owner_id: Some("student-1".to_string()),
            ..Default::default()
        };
        let page = page_records(&records, &reviewer(), &filter, 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "a");

        let filter = RecordFilter {
            title_contains: Some("WATER".to_string()),
            ..Default::default()
        };
        let page = page_records(&records, &reviewer(), &filter, 1, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "a");

        let filter = RecordFilter {
            status: Some(Status::Draft),
            ..Default::default()
        };
        let page = page_records(&records, &reviewer(), &filter, 1, 10);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn tombstoned_records_never_appear() {
        let mut rec = record("a", "student-1", Some("2026-02-01T10:00:00Z"));
        rec.deleted = true;
        let records = vec![rec];
        let page = page_records(&records, &reviewer(), &RecordFilter::default(), 1, 10);
        assert_eq!(page.total, 0);
    }
}
