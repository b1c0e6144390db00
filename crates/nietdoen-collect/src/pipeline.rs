//! Collection session: drives one selected image through
//! `Empty → Uploading → Analyzing → Reviewing → Saving → Empty`.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use nietdoen_ai::{ExtractionService, ImageRef, PromptBuilder, parse_response};
use nietdoen_core::review::{self, Edit};
use nietdoen_core::{DraftRecord, GeoReading, Language, SchemaRegistry, StorageRefs};
use nietdoen_session::GeoFeed;
use nietdoen_store::{DocumentStore, ObjectStore};
use tracing::{debug, error, info};

use crate::error::{PipelineError, SaveError};
use crate::resize::SourceImage;
use crate::writer::{RecordWriter, WrittenSign};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty,
    Uploading,
    Analyzing,
    Reviewing,
    Saving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Uploading => "uploading",
            Self::Analyzing => "analyzing",
            Self::Reviewing => "reviewing",
            Self::Saving => "saving",
        };
        f.write_str(s)
    }
}

/// Backing services, constructed by the caller.
#[derive(Clone)]
pub struct Services {
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub extractor: Arc<dyn ExtractionService>,
    pub schema: Arc<SchemaRegistry>,
    pub geo: GeoFeed,
    pub collection: String,
}

pub struct CollectSession {
    objects: Arc<dyn ObjectStore>,
    extractor: Arc<dyn ExtractionService>,
    schema: Arc<SchemaRegistry>,
    geo: GeoFeed,
    writer: RecordWriter,
    language: Language,
    stage: Stage,
    image: Option<SourceImage>,
    draft: Option<DraftRecord>,
    last_error: Option<String>,
}

impl CollectSession {
    pub fn new(services: Services, language: Language) -> Self {
        Self {
            writer: RecordWriter::new(services.documents, services.collection),
            objects: services.objects,
            extractor: services.extractor,
            schema: services.schema,
            geo: services.geo,
            language,
            stage: Stage::Empty,
            image: None,
            draft: None,
            last_error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    pub fn draft(&self) -> Option<&DraftRecord> {
        self.draft.as_ref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Latest location reading, independent of what the draft latched.
    pub fn location(&self) -> Option<GeoReading> {
        self.geo.current()
    }

    /// Error message of the most recent failed action, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Language for the next analysis. An existing draft is relabelled.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        if let Some(draft) = &mut self.draft {
            draft.set_language(language);
        }
    }

    fn transition(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "stage change");
        self.stage = stage;
    }

    /// Pick a new image. Any previous draft is discarded.
    pub fn select_image(&mut self, image: SourceImage) {
        info!(
            name = %image.name,
            mime_type = %image.mime_type,
            size = image.bytes.len(),
            "image selected"
        );
        self.reset();
        self.image = Some(image);
    }

    /// Drop the image, its draft and storage references.
    pub fn remove_image(&mut self) {
        if self.image.is_some() || self.draft.is_some() {
            info!("image removed");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.image = None;
        self.draft = None;
        self.last_error = None;
        self.transition(Stage::Empty);
    }

    /// Resize, upload, and analyze the selected image, then seed a new draft.
    ///
    /// On failure the session falls back to `Reviewing` if a draft exists,
    /// otherwise to `Empty`.
    pub async fn analyze(&mut self) -> Result<&DraftRecord, PipelineError> {
        self.last_error = None;
        let image = self.image.clone().ok_or(PipelineError::NoImage)?;

        match self.run_analysis(&image).await {
            Ok(draft) => {
                self.draft = Some(draft);
                self.transition(Stage::Reviewing);
                self.draft.as_ref().ok_or(PipelineError::NoDraft)
            }
            Err(e) => {
                error!(image = %image.name, error = %e, "analysis failed");
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&mut self, e: &dyn fmt::Display) {
        self.last_error = Some(e.to_string());
        let stage = if self.draft.is_some() {
            Stage::Reviewing
        } else {
            Stage::Empty
        };
        self.transition(stage);
    }

    async fn run_analysis(&mut self, image: &SourceImage) -> Result<DraftRecord, PipelineError> {
        self.transition(Stage::Uploading);

        // 1. Reduced copy in the original MIME type.
        let reduced = image.reduced()?;

        // 2. Both copies uploaded together; the first failure drops the other.
        let id = Utc::now().timestamp_millis();
        let sm_path = format!("images/{id}_sm");
        let lg_path = format!("images/{id}_lg");
        let (sm, lg) = futures::try_join!(
            self.objects.upload(&sm_path, reduced, &image.mime_type),
            self.objects
                .upload(&lg_path, image.bytes.clone(), &image.mime_type),
        )?;
        info!(sm = %sm.reference, lg = %lg.reference, "images uploaded");

        // 3. The model reads the full-resolution copy by address.
        let mime_type = sm.content_type.ok_or(PipelineError::MissingContentType)?;
        let request = PromptBuilder::new(&self.schema).request(
            self.language,
            ImageRef {
                uri: lg.reference.clone(),
                mime_type,
            },
        );

        // 4. One round trip.
        self.transition(Stage::Analyzing);
        let raw = self.extractor.generate(&request).await?;

        // 5. Schema-checked parse.
        let result = parse_response(&self.schema, &raw)?;

        // 6. Freeze the location and references seen right now.
        let coordinates = self.geo.current().map(|r| r.point);
        if coordinates.is_none() {
            debug!("no location fix at analysis time");
        }
        info!(fields = result.len(), "analysis complete");
        Ok(DraftRecord::from_extraction(
            self.language,
            result,
            StorageRefs {
                sm: sm.reference,
                lg: lg.reference,
            },
            coordinates,
        ))
    }

    /// Apply one form edit to the draft under review.
    pub fn edit(&mut self, edit: Edit) -> Result<(), PipelineError> {
        self.last_error = None;
        let draft = self.draft.as_mut().ok_or(PipelineError::NoDraft)?;
        review::apply_edit(&self.schema, draft, edit)?;
        Ok(())
    }

    /// Take the current reading if the draft has no coordinate yet.
    fn latch_pending_coordinates(&mut self) {
        let Some(draft) = &mut self.draft else {
            return;
        };
        if let Some(reading) = self.geo.current()
            && draft.latch_coordinates(reading.point)
        {
            info!(
                latitude = reading.point.latitude,
                longitude = reading.point.longitude,
                "late location fix latched"
            );
        }
    }

    /// Validate the whole draft, reporting every offending field.
    pub fn validate(&mut self) -> Result<(), SaveError> {
        self.latch_pending_coordinates();
        let draft = self.draft.as_ref().ok_or(SaveError::NoDraft)?;
        review::validate(&self.schema, draft).map_err(SaveError::Invalid)
    }

    /// Validate and write the draft. On success the session is reset.
    pub async fn save(&mut self) -> Result<WrittenSign, SaveError> {
        self.last_error = None;
        if let Err(e) = self.validate() {
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        let draft = self.draft.clone().ok_or(SaveError::NoDraft)?;

        self.transition(Stage::Saving);
        match self.writer.write(&self.schema, &draft, Utc::now()).await {
            Ok(written) => {
                self.reset();
                Ok(written)
            }
            Err(e) => {
                error!(error = %e, "save failed");
                self.fail(&e);
                Err(e)
            }
        }
    }
}
