//! Request checks that run before any write is issued.
//!
//! Everything here is pure: callers pass `now` and the configuration, so the
//! rules can be exercised without a database or clock.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::PostServiceConfig;
use crate::domains::posts::data::{
    is_signed_upload_key, ImageFormat, OptionFile, UpsertPostOptionRequest,
};
use crate::domains::posts::error::PostError;

/// Scheduling and option fields after merging the request over the stored post
#[derive(Debug, Clone, Copy)]
pub struct PostShape<'a> {
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub options: &'a [UpsertPostOptionRequest],
}

/// A post is live once its opening time has passed
pub fn is_live(opens_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    opens_at.is_some_and(|opens_at| opens_at < now)
}

/// Reject opening times further in the past than the grace window
pub fn check_opens_at_not_passed(
    opens_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &PostServiceConfig,
) -> Result<(), PostError> {
    match opens_at {
        Some(opens_at) if opens_at < now - config.opens_at_grace => {
            Err(PostError::OpensAtAlreadyPassed)
        }
        _ => Ok(()),
    }
}

/// Stored posts may only be edited before they go live
pub fn check_not_live(
    stored_opens_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), PostError> {
    match stored_opens_at {
        Some(opens_at) if opens_at <= now => Err(PostError::OpensAtAlreadyPassed),
        _ => Ok(()),
    }
}

/// Shape checks shared by the create and update paths, in the order they
/// are reported
pub fn check_shape(
    shape: PostShape<'_>,
    now: DateTime<Utc>,
    config: &PostServiceConfig,
) -> Result<(), PostError> {
    if let (Some(opens_at), Some(closes_at)) = (shape.opens_at, shape.closes_at) {
        if closes_at <= opens_at {
            return Err(PostError::ClosesAtNotAfterOpensAt);
        }
    }

    if shape.options.len() > config.max_options {
        return Err(PostError::TooManyOptions {
            max: config.max_options,
        });
    }

    if is_live(shape.opens_at, now) {
        if shape.options.len() < config.min_live_options {
            return Err(PostError::TooFewOptions {
                min: config.min_live_options,
            });
        }
        if shape.closes_at.is_none() {
            return Err(PostError::ClosesAtNotSet);
        }
    }

    check_positions(shape.options)?;
    check_unique_ids(shape.options)?;
    check_files(shape.options, config)
}

/// Positions must be exactly `1..=len`
pub fn check_positions(options: &[UpsertPostOptionRequest]) -> Result<(), PostError> {
    let mut positions: Vec<i32> = options.iter().map(|o| o.position).collect();
    positions.sort_unstable();

    let contiguous = positions
        .iter()
        .zip(1..)
        .all(|(position, expected)| *position == expected);

    if contiguous {
        Ok(())
    } else {
        Err(PostError::OptionPositionsInvalid)
    }
}

fn check_unique_ids(options: &[UpsertPostOptionRequest]) -> Result<(), PostError> {
    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        if !seen.insert(option.id) {
            return Err(PostError::Validation(format!(
                "option {} appears more than once",
                option.id
            )));
        }
    }
    Ok(())
}

/// Validate every file carried by the request
pub fn check_files(
    options: &[UpsertPostOptionRequest],
    config: &PostServiceConfig,
) -> Result<(), PostError> {
    for option in options {
        match &option.file {
            None => {}
            Some(OptionFile::SignedUpload { bucket, file_key }) => {
                if bucket != &config.bucket_name {
                    return Err(PostError::Validation(format!(
                        "invalid bucket name: {}",
                        bucket
                    )));
                }
                if ImageFormat::from_file_name(file_key).is_none() {
                    return Err(PostError::UnsupportedFileType);
                }
                // Only keys minted for signed URLs; never another option's stored file
                if !is_signed_upload_key(file_key) {
                    return Err(PostError::Validation(format!(
                        "file key {} was not issued for upload",
                        file_key
                    )));
                }
            }
            Some(OptionFile::Upload {
                bytes,
                content_type,
            }) => {
                if ImageFormat::from_content_type(content_type).is_none() {
                    return Err(PostError::UnsupportedFileType);
                }
                if bytes.len() > config.max_upload_bytes {
                    return Err(PostError::FileTooLarge {
                        max_bytes: config.max_upload_bytes,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::OptionId;
    use chrono::Duration;

    fn config() -> PostServiceConfig {
        PostServiceConfig::builder().bucket_name("quorum-vote").build()
    }

    fn options(n: i32) -> Vec<UpsertPostOptionRequest> {
        (1..=n)
            .map(|position| {
                UpsertPostOptionRequest::signed(
                    OptionId::new(),
                    position,
                    "quorum-vote",
                    format!("post-options/signed/{}.png", position),
                )
            })
            .collect()
    }

    fn shape(
        opens_at: Option<DateTime<Utc>>,
        closes_at: Option<DateTime<Utc>>,
        options: &[UpsertPostOptionRequest],
    ) -> PostShape<'_> {
        PostShape {
            opens_at,
            closes_at,
            options,
        }
    }

    #[test]
    fn grace_window_allows_recent_opening_times() {
        let now = Utc::now();
        let config = config();

        assert!(check_opens_at_not_passed(Some(now - Duration::minutes(9)), now, &config).is_ok());
        assert!(matches!(
            check_opens_at_not_passed(Some(now - Duration::minutes(11)), now, &config),
            Err(PostError::OpensAtAlreadyPassed)
        ));
        assert!(check_opens_at_not_passed(None, now, &config).is_ok());
    }

    #[test]
    fn stored_post_is_editable_only_before_opening() {
        let now = Utc::now();

        assert!(check_not_live(None, now).is_ok());
        assert!(check_not_live(Some(now + Duration::hours(1)), now).is_ok());
        assert!(matches!(
            check_not_live(Some(now - Duration::seconds(1)), now),
            Err(PostError::OpensAtAlreadyPassed)
        ));
    }

    #[test]
    fn closes_at_must_follow_opens_at() {
        let now = Utc::now();
        let opens = now + Duration::hours(1);
        let opts = options(2);

        let result = check_shape(shape(Some(opens), Some(opens), &opts), now, &config());
        assert!(matches!(result, Err(PostError::ClosesAtNotAfterOpensAt)));

        let result = check_shape(
            shape(Some(opens), Some(opens + Duration::seconds(1)), &opts),
            now,
            &config(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn six_options_accepted_seven_rejected() {
        let now = Utc::now();

        let six = options(6);
        assert!(check_shape(shape(None, None, &six), now, &config()).is_ok());

        let seven = options(7);
        assert!(matches!(
            check_shape(shape(None, None, &seven), now, &config()),
            Err(PostError::TooManyOptions { max: 6 })
        ));
    }

    #[test]
    fn single_option_is_fine_until_live() {
        let now = Utc::now();
        let one = options(1);

        let draft = shape(Some(now + Duration::days(1)), None, &one);
        assert!(check_shape(draft, now, &config()).is_ok());

        let live = shape(
            Some(now - Duration::minutes(1)),
            Some(now + Duration::days(1)),
            &one,
        );
        assert!(matches!(
            check_shape(live, now, &config()),
            Err(PostError::TooFewOptions { min: 2 })
        ));
    }

    #[test]
    fn live_post_requires_closing_time() {
        let now = Utc::now();
        let two = options(2);

        let result = check_shape(shape(Some(now - Duration::minutes(1)), None, &two), now, &config());
        assert!(matches!(result, Err(PostError::ClosesAtNotSet)));
    }

    #[test]
    fn too_few_reported_before_missing_closing_time() {
        let now = Utc::now();
        let result = check_shape(shape(Some(now - Duration::minutes(1)), None, &[]), now, &config());
        assert!(matches!(result, Err(PostError::TooFewOptions { .. })));
    }

    #[test]
    fn positions_must_cover_one_to_n() {
        let mut opts = options(3);
        assert!(check_positions(&opts).is_ok());
        assert!(check_positions(&[]).is_ok());

        opts[2].position = 4;
        assert!(matches!(
            check_positions(&opts),
            Err(PostError::OptionPositionsInvalid)
        ));

        opts[2].position = 2;
        assert!(matches!(
            check_positions(&opts),
            Err(PostError::OptionPositionsInvalid)
        ));

        opts[0].position = 0;
        opts[2].position = 3;
        assert!(matches!(
            check_positions(&opts),
            Err(PostError::OptionPositionsInvalid)
        ));
    }

    #[test]
    fn positions_may_arrive_in_any_order() {
        let mut opts = options(3);
        opts.reverse();
        assert!(check_positions(&opts).is_ok());
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let mut opts = options(2);
        opts[1].id = opts[0].id;
        let result = check_shape(shape(None, None, &opts), Utc::now(), &config());
        assert!(matches!(result, Err(PostError::Validation(_))));
    }

    #[test]
    fn signed_uploads_must_target_configured_bucket() {
        let opts = vec![UpsertPostOptionRequest::signed(
            OptionId::new(),
            1,
            "someone-elses-bucket",
            "post-options/signed/x.png",
        )];
        assert!(matches!(
            check_files(&opts, &config()),
            Err(PostError::Validation(msg)) if msg.contains("someone-elses-bucket")
        ));
    }

    #[test]
    fn signed_upload_keys_need_image_extension() {
        let opts = vec![UpsertPostOptionRequest::signed(
            OptionId::new(),
            1,
            "quorum-vote",
            "post-options/signed/x.svg",
        )];
        assert!(matches!(
            check_files(&opts, &config()),
            Err(PostError::UnsupportedFileType)
        ));
    }

    #[test]
    fn signed_uploads_cannot_point_at_stored_option_files() {
        let post_id = crate::common::PostId::new();
        let victim = OptionId::new();
        let stored_key = format!("post-options/{}/{}.png", post_id, victim);

        for key in [stored_key.as_str(), "post-options/legacy.png"] {
            let opts = vec![UpsertPostOptionRequest::signed(
                OptionId::new(),
                1,
                "quorum-vote",
                key,
            )];
            assert!(matches!(
                check_files(&opts, &config()),
                Err(PostError::Validation(msg)) if msg.contains("was not issued")
            ));
        }
    }

    #[test]
    fn raw_uploads_are_limited_by_type_and_size() {
        let config = config();

        let pdf = vec![UpsertPostOptionRequest::upload(
            OptionId::new(),
            1,
            vec![0u8; 16],
            "application/pdf",
        )];
        assert!(matches!(
            check_files(&pdf, &config),
            Err(PostError::UnsupportedFileType)
        ));

        let huge = vec![UpsertPostOptionRequest::upload(
            OptionId::new(),
            1,
            vec![0u8; config.max_upload_bytes + 1],
            "image/png",
        )];
        assert!(matches!(
            check_files(&huge, &config),
            Err(PostError::FileTooLarge { .. })
        ));

        let ok = vec![UpsertPostOptionRequest::upload(
            OptionId::new(),
            1,
            vec![0u8; config.max_upload_bytes],
            "image/gif",
        )];
        assert!(check_files(&ok, &config).is_ok());
    }
}
