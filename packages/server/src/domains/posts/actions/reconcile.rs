//! Diff the desired option and tag sets against what is stored.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::common::OptionId;
use crate::domains::posts::data::{file_ref, OptionFile, UpsertPostOptionRequest};
use crate::domains::posts::error::PostError;
use crate::domains::posts::models::PostOption;

/// New option still waiting for its file to be stored or verified
#[derive(Debug, Clone)]
pub struct OptionInsert {
    pub id: OptionId,
    pub position: i32,
    pub file: OptionFile,
}

/// Option writes in the order they must be applied
#[derive(Debug, Clone, Default)]
pub struct OptionPlan {
    pub delete: Vec<OptionId>,
    pub reposition: Vec<(OptionId, i32)>,
    pub insert: Vec<OptionInsert>,
}

impl OptionPlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.reposition.is_empty() && self.insert.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPlan {
    pub insert: Vec<String>,
    pub delete: Vec<String>,
}

/// Compare stored options with the desired list.
///
/// Options missing from `desired` are deleted, known ids whose position moved
/// are repositioned, and unknown ids are inserted. An existing option keeps
/// its file: a signed upload pointing at the same object is accepted, any
/// other file is rejected.
pub fn diff_options(
    existing: &[PostOption],
    desired: &[UpsertPostOptionRequest],
) -> Result<OptionPlan, PostError> {
    let existing_by_id: HashMap<OptionId, &PostOption> =
        existing.iter().map(|o| (o.id, o)).collect();
    let desired_ids: HashSet<OptionId> = desired.iter().map(|o| o.id).collect();

    let mut plan = OptionPlan {
        delete: existing
            .iter()
            .filter(|o| !desired_ids.contains(&o.id))
            .map(|o| o.id)
            .collect(),
        ..Default::default()
    };

    for option in desired {
        match (existing_by_id.get(&option.id), &option.file) {
            (Some(stored), file) => {
                if let Some(file) = file {
                    if !same_file(stored, file) {
                        return Err(PostError::OptionFileImmutable {
                            option_id: option.id,
                        });
                    }
                }
                if stored.position != option.position {
                    plan.reposition.push((option.id, option.position));
                }
            }
            (None, Some(file)) => plan.insert.push(OptionInsert {
                id: option.id,
                position: option.position,
                file: file.clone(),
            }),
            (None, None) => {
                return Err(PostError::OptionFileRequired {
                    option_id: option.id,
                })
            }
        }
    }

    Ok(plan)
}

fn same_file(stored: &PostOption, file: &OptionFile) -> bool {
    match file {
        OptionFile::SignedUpload { bucket, file_key } => stored.file_ref == file_ref(bucket, file_key),
        OptionFile::Upload { .. } => false,
    }
}

/// Trim, drop blanks and dedupe, keeping a stable order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tags to add and remove so the stored set matches `desired`
pub fn diff_tags(existing: &[String], desired: &[String]) -> TagPlan {
    let desired = normalize_tags(desired);
    let existing: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
    let wanted: BTreeSet<&str> = desired.iter().map(String::as_str).collect();

    TagPlan {
        insert: wanted
            .difference(&existing)
            .map(|t| t.to_string())
            .collect(),
        delete: existing
            .difference(&wanted)
            .map(|t| t.to_string())
            .collect(),
    }
}
