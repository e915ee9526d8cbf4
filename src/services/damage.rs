//! Damage verification service
//!
//! Evidence images are uploaded to object storage, scored by the
//! verification agent and recorded as damage reports. The same scoring step
//! backs the report written when an item is returned, where it is
//! best-effort.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::{
    agents::{AgentError, AgentName, AgentRegistry},
    error::{AppError, AppResult},
    models::{
        damage_report::{VerificationResult, DEFAULT_DESCRIPTION},
        DamageReport, DamageReportStatus, ImageUpload, NewDamageReport, Rental, Session,
    },
    repository::Repository,
    services::storage::BlobStore,
};

/// Inputs of a damage verification, as received
#[derive(Debug, Default)]
pub struct DamageEvidence {
    pub rental_id: Option<Uuid>,
    pub reporter_id: Option<Uuid>,
    pub before_image: Option<ImageUpload>,
    pub after_image: Option<ImageUpload>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct DamageService {
    repository: Repository,
    agents: AgentRegistry,
    blobs: Arc<dyn BlobStore>,
}

impl DamageService {
    pub fn new(repository: Repository, agents: AgentRegistry, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repository,
            agents,
            blobs,
        }
    }

    /// Upload both images, score them and record the report.
    ///
    /// Nothing is written when the verification agent fails or answers
    /// something unusable.
    pub async fn verify_damage(
        &self,
        session: &Session,
        evidence: DamageEvidence,
    ) -> AppResult<DamageReport> {
        let before = evidence.before_image.filter(|i| !i.is_empty());
        let after = evidence.after_image.filter(|i| !i.is_empty());

        let (rental_id, reporter_id, before, after) =
            match (evidence.rental_id, evidence.reporter_id, before, after) {
                (Some(rental_id), Some(reporter_id), Some(before), Some(after)) => {
                    (rental_id, reporter_id, before, after)
                }
                (rental_id, reporter_id, before, after) => {
                    let mut missing = Vec::new();
                    if rental_id.is_none() {
                        missing.push("rental_id");
                    }
                    if reporter_id.is_none() {
                        missing.push("reporter_id");
                    }
                    if before.is_none() {
                        missing.push("before_image");
                    }
                    if after.is_none() {
                        missing.push("after_image");
                    }
                    return Err(AppError::MissingFields(missing));
                }
            };

        if reporter_id != session.user_id {
            return Err(AppError::Forbidden(
                "Damage can only be reported in your own name".to_string(),
            ));
        }

        let rental = self.repository.rentals.get(rental_id).await?;
        if !rental.is_party(reporter_id) {
            return Err(AppError::Forbidden(format!(
                "User {} is not part of rental {}",
                reporter_id, rental_id
            )));
        }

        let before_url = self.upload_evidence(rental_id, &before).await?;
        let after_url = self.upload_evidence(rental_id, &after).await?;

        let result = self
            .score(&before_url, &after_url)
            .await
            .map_err(AppError::VerificationAgentFailed)?;

        let report = NewDamageReport {
            rental_id,
            reporter_id,
            description: description_or_default(evidence.description),
            image_before_url: Some(before_url),
            image_after_url: after_url,
            damage_heatmap_url: result.damage_heatmap_url,
            verification_score: Some(result.verification_score),
            verified_by_agent: true,
            status: DamageReportStatus::Pending,
        };

        let created = self.persist(&report).await?;
        tracing::info!(
            "Damage report {} for rental {} scored {}",
            created.report_id,
            rental_id,
            result.verification_score
        );
        Ok(created)
    }

    /// Record the report of a return. Scoring is attempted only when a
    /// listing picture exists; without a score the report waits for review.
    pub async fn assess_return(
        &self,
        rental: &Rental,
        reporter_id: Uuid,
        before_url: Option<String>,
        after_url: String,
        description: Option<String>,
    ) -> AppResult<DamageReport> {
        let scored = match &before_url {
            Some(before) => match self.score(before, &after_url).await {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(
                        "Return of rental {} recorded without a damage score: {}",
                        rental.rental_id,
                        e
                    );
                    None
                }
            },
            None => {
                tracing::warn!(
                    "Item {} has no listing picture, return of rental {} needs review",
                    rental.item_id,
                    rental.rental_id
                );
                None
            }
        };

        let report = NewDamageReport {
            rental_id: rental.rental_id,
            reporter_id,
            description: description_or_default(description),
            image_before_url: before_url,
            image_after_url: after_url,
            damage_heatmap_url: scored.as_ref().and_then(|r| r.damage_heatmap_url.clone()),
            verification_score: scored.as_ref().map(|r| r.verification_score),
            verified_by_agent: scored.is_some(),
            status: if scored.is_some() {
                DamageReportStatus::Pending
            } else {
                DamageReportStatus::PendingReview
            },
        };

        self.persist(&report).await
    }

    /// Store an evidence image and return its public URL
    pub async fn upload_evidence(&self, rental_id: Uuid, image: &ImageUpload) -> AppResult<String> {
        let path = evidence_path(rental_id, &image.filename);
        self.blobs
            .upload(&path, image.bytes.clone(), &image.content_type)
            .await
            .map_err(|e| match e {
                AppError::UploadFailed(_) => e,
                other => AppError::UploadFailed(other.to_string()),
            })
    }

    /// Reports of a rental, for its renter or lender
    pub async fn list_reports(&self, session: &Session, rental_id: Uuid) -> AppResult<Vec<DamageReport>> {
        let rental = self.repository.rentals.get(rental_id).await?;
        if !rental.is_party(session.user_id) {
            return Err(AppError::Forbidden(format!(
                "User {} is not part of rental {}",
                session.user_id, rental_id
            )));
        }
        self.repository.damage_reports.list_for_rental(rental_id).await
    }

    async fn score(&self, before_url: &str, after_url: &str) -> Result<VerificationResult, AgentError> {
        let answer = self
            .agents
            .invoke(
                AgentName::Verification,
                json!({
                    "before_image_url": before_url,
                    "after_image_url": after_url,
                }),
            )
            .await?;

        let result: VerificationResult =
            serde_json::from_value(answer).map_err(|e| AgentError::InvalidResponse {
                agent: AgentName::Verification.to_string(),
                reason: e.to_string(),
            })?;

        if !result.is_valid() {
            return Err(AgentError::InvalidResponse {
                agent: AgentName::Verification.to_string(),
                reason: format!(
                    "verification_score {} is outside 0.0..=1.0",
                    result.verification_score
                ),
            });
        }

        Ok(result)
    }

    async fn persist(&self, report: &NewDamageReport) -> AppResult<DamageReport> {
        self.repository
            .damage_reports
            .insert(report)
            .await
            .map_err(|e| AppError::PersistFailed(e.to_string()))
    }
}

fn description_or_default(description: Option<String>) -> String {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

/// `{rental_id}/{unique}-{filename}`, with the filename reduced to a safe
/// character set
pub fn evidence_path(rental_id: Uuid, filename: &str) -> String {
    let name: String = filename
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_start_matches('.');
    let name = if name.is_empty() { "image" } else { name };

    format!("{}/{}-{}", rental_id, Uuid::new_v4(), name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agents::MockAgent,
        models::RentalStatus,
        repository::{
            MockDamageReportStore, MockItemStore, MockPaymentStore, MockRentalStore, MockUserStore,
        },
        services::storage::MockBlobStore,
    };
    use axum::body::Bytes;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn rental(renter_id: Uuid, lender_id: Uuid) -> Rental {
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        Rental {
            rental_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            renter_id,
            lender_id,
            start_date: day,
            end_date: day,
            status: RentalStatus::Returned,
            total_cost: Decimal::from(100),
            actual_end_date: None,
            actual_total_cost: None,
            returned_at: None,
            created_at: Utc::now(),
        }
    }

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: Bytes::from_static(b"jpeg"),
        }
    }

    fn service(
        rentals: MockRentalStore,
        reports: MockDamageReportStore,
        agent: MockAgent,
        blobs: MockBlobStore,
    ) -> DamageService {
        let repository = Repository::new(
            Arc::new(MockUserStore::new()),
            Arc::new(MockItemStore::new()),
            Arc::new(rentals),
            Arc::new(reports),
            Arc::new(MockPaymentStore::new()),
        );
        let agents = AgentRegistry::new().register(AgentName::Verification, Arc::new(agent));
        DamageService::new(repository, agents, Arc::new(blobs))
    }

    fn uploading_blobs() -> MockBlobStore {
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_upload()
            .returning(|path, _, _| Ok(format!("https://cdn.test/{}", path)));
        blobs
    }

    #[test]
    fn test_evidence_path_sanitizes_filename() {
        let rental_id = Uuid::new_v4();
        let path = evidence_path(rental_id, "../My Photo (1).JPG");
        assert!(path.starts_with(&format!("{}/", rental_id)));
        assert!(path.ends_with("-My_Photo__1_.JPG"));
        assert!(evidence_path(rental_id, "").ends_with("-image"));
        assert_ne!(evidence_path(rental_id, "a.jpg"), evidence_path(rental_id, "a.jpg"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_named() {
        let svc = service(
            MockRentalStore::new(),
            MockDamageReportStore::new(),
            MockAgent::new(),
            MockBlobStore::new(),
        );
        let session = Session { user_id: Uuid::new_v4(), email: None };
        let err = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(Uuid::new_v4()),
                    after_image: Some(image("after.jpg")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingFields(f) if f == vec!["reporter_id", "before_image"]));
    }

    #[tokio::test]
    async fn test_verify_damage_records_score() {
        let renter = Uuid::new_v4();
        let rental = rental(renter, Uuid::new_v4());
        let rental_id = rental.rental_id;

        let mut rentals = MockRentalStore::new();
        rentals.expect_get().returning(move |_| Ok(rental.clone()));

        let mut agent = MockAgent::new();
        agent.expect_call().times(1).returning(|payload| {
            assert!(payload["before_image_url"].as_str().unwrap().contains("before.jpg"));
            Ok(json!({ "verification_score": 0.3, "damage_heatmap_url": "https://cdn.test/heat.png" }))
        });

        let mut reports = MockDamageReportStore::new();
        reports.expect_insert().times(1).returning(|report| {
            assert_eq!(report.verification_score, Some(0.3));
            assert!(report.verified_by_agent);
            assert_eq!(report.status, DamageReportStatus::Pending);
            assert_eq!(report.description, DEFAULT_DESCRIPTION);
            Ok(DamageReport {
                report_id: Uuid::new_v4(),
                rental_id: report.rental_id,
                reporter_id: report.reporter_id,
                description: report.description.clone(),
                image_before_url: report.image_before_url.clone(),
                image_after_url: report.image_after_url.clone(),
                damage_heatmap_url: report.damage_heatmap_url.clone(),
                verification_score: report.verification_score,
                verified_by_agent: report.verified_by_agent,
                status: report.status,
                created_at: Utc::now(),
            })
        });

        let svc = service(rentals, reports, agent, uploading_blobs());
        let session = Session { user_id: renter, email: None };
        let report = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(rental_id),
                    reporter_id: Some(renter),
                    before_image: Some(image("before.jpg")),
                    after_image: Some(image("after.jpg")),
                    description: Some("  ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(report.verification_score, Some(0.3));
        assert!(report.image_after_url.starts_with(&format!("https://cdn.test/{}/", rental_id)));
    }

    #[tokio::test]
    async fn test_failed_verification_writes_no_report() {
        let renter = Uuid::new_v4();
        let rental = rental(renter, Uuid::new_v4());
        let rental_id = rental.rental_id;

        let mut rentals = MockRentalStore::new();
        rentals.expect_get().returning(move |_| Ok(rental.clone()));

        let mut agent = MockAgent::new();
        agent.expect_call().times(1).returning(|_| {
            Err(AgentError::ExecutionFailed {
                agent: "verification".to_string(),
                code: Some(1),
                stderr: "model missing".to_string(),
            })
        });

        let mut reports = MockDamageReportStore::new();
        reports.expect_insert().never();

        let svc = service(rentals, reports, agent, uploading_blobs());
        let session = Session { user_id: renter, email: None };
        let err = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(rental_id),
                    reporter_id: Some(renter),
                    before_image: Some(image("before.jpg")),
                    after_image: Some(image("after.jpg")),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::VerificationAgentFailed(AgentError::ExecutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let renter = Uuid::new_v4();
        let rental = rental(renter, Uuid::new_v4());
        let rental_id = rental.rental_id;

        let mut rentals = MockRentalStore::new();
        rentals.expect_get().returning(move |_| Ok(rental.clone()));

        let mut agent = MockAgent::new();
        agent
            .expect_call()
            .returning(|_| Ok(json!({ "verification_score": 7.0 })));

        let mut reports = MockDamageReportStore::new();
        reports.expect_insert().never();

        let svc = service(rentals, reports, agent, uploading_blobs());
        let session = Session { user_id: renter, email: None };
        let err = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(rental_id),
                    reporter_id: Some(renter),
                    before_image: Some(image("before.jpg")),
                    after_image: Some(image("after.jpg")),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::VerificationAgentFailed(AgentError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_outsider_cannot_report() {
        let rental = rental(Uuid::new_v4(), Uuid::new_v4());
        let rental_id = rental.rental_id;
        let outsider = Uuid::new_v4();

        let mut rentals = MockRentalStore::new();
        rentals.expect_get().returning(move |_| Ok(rental.clone()));
        let mut blobs = MockBlobStore::new();
        blobs.expect_upload().never();

        let svc = service(rentals, MockDamageReportStore::new(), MockAgent::new(), blobs);
        let session = Session { user_id: outsider, email: None };
        let err = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(rental_id),
                    reporter_id: Some(outsider),
                    before_image: Some(image("before.jpg")),
                    after_image: Some(image("after.jpg")),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_upload_failure_stops_before_scoring() {
        let renter = Uuid::new_v4();
        let rental = rental(renter, Uuid::new_v4());
        let rental_id = rental.rental_id;

        let mut rentals = MockRentalStore::new();
        rentals.expect_get().returning(move |_| Ok(rental.clone()));
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_upload()
            .returning(|_, _, _| Err(AppError::Internal("bucket gone".to_string())));
        let mut agent = MockAgent::new();
        agent.expect_call().never();

        let svc = service(rentals, MockDamageReportStore::new(), agent, blobs);
        let session = Session { user_id: renter, email: None };
        let err = svc
            .verify_damage(
                &session,
                DamageEvidence {
                    rental_id: Some(rental_id),
                    reporter_id: Some(renter),
                    before_image: Some(image("before.jpg")),
                    after_image: Some(image("after.jpg")),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UploadFailed(_)));
    }
}
