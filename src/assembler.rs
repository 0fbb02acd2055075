//! Builds the report: classify → reconcile → fetch → record, one dependency
//! at a time, in input order.

use indicatif::ProgressBar;

use crate::config::OverrideTables;
use crate::error::ReportError;
use crate::models::{
    Descriptor, Provider, Report, ReportHeader, ReportRecord, VersionDetails, UNKNOWN_LICENSE,
};
use crate::notify::Notifier;
use crate::provider::classifier::classify;
use crate::provider::{is_full_hash, stub_record, CommitResolver, MetadataClient};
use crate::reconcile::{Reconciler, RevisionSpec};

/// Clients the assembler dispatches to.
pub struct Providers<'a> {
    pub github: &'a dyn MetadataClient,
    pub gerrit: &'a dyn MetadataClient,
    /// First hop for providers that only resolve full hashes.
    pub mirror: &'a dyn CommitResolver,
}

/// Result of processing a single dependency.
enum Outcome {
    Success(ReportRecord),
    /// Everything resolved except the license; pending notification.
    LicenseGap(ReportRecord),
    Fatal(ReportError),
}

pub struct Assembler<'a> {
    product: String,
    overrides: &'a OverrideTables,
    providers: Providers<'a>,
    reconciler: Reconciler<'a>,
    notifier: &'a dyn Notifier,
    progress: Option<ProgressBar>,
}

impl<'a> Assembler<'a> {
    pub fn new(
        product: &str,
        overrides: &'a OverrideTables,
        providers: Providers<'a>,
        notifier: &'a dyn Notifier,
    ) -> Self {
        let reconciler = Reconciler::new(overrides, providers.mirror);
        Assembler {
            product: product.to_string(),
            overrides,
            providers,
            reconciler,
            notifier,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolve every descriptor and merge the records under `header`.
    ///
    /// Stops at the first fatal error; a missing license is only fatal when
    /// the notification about it fails.
    pub async fn assemble(
        &self,
        header: ReportHeader,
        descriptors: &[Descriptor],
    ) -> Result<Report, ReportError> {
        let mut records = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if let Some(pb) = &self.progress {
                pb.set_message(descriptor.name.clone());
            }

            let record = match self.process(descriptor).await {
                Outcome::Success(record) => record,
                Outcome::LicenseGap(record) => self.settle_license_gap(record).await?,
                Outcome::Fatal(err) => return Err(err),
            };
            records.push(record);

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("Done");
        }

        Ok(Report::new(header, records))
    }

    async fn process(&self, descriptor: &Descriptor) -> Outcome {
        let provider = classify(&descriptor.name, self.overrides);
        tracing::info!(dependency = %descriptor.name, %provider, "transforming");

        let client = match provider {
            Provider::Github => self.providers.github,
            Provider::Gerrit => self.providers.gerrit,
            Provider::Gitlab | Provider::Unknown => {
                if provider == Provider::Unknown {
                    tracing::warn!(dependency = %descriptor.name, "unable to determine repo source");
                }
                return Outcome::Success(stub_record(descriptor, provider));
            }
        };

        match self.resolve(descriptor, provider, client).await {
            Ok(record) if record.license.is_none() => Outcome::LicenseGap(record),
            Ok(record) => Outcome::Success(record),
            Err(err) => Outcome::Fatal(err),
        }
    }

    async fn resolve(
        &self,
        descriptor: &Descriptor,
        provider: Provider,
        client: &dyn MetadataClient,
    ) -> Result<ReportRecord, ReportError> {
        let name = descriptor.name.as_str();

        let repo = client
            .locate(name)
            .map_err(|e| e.for_dependency(name, "locate repository"))?;

        let installed = self
            .reconciler
            .reconcile(name, &descriptor.version, client, &repo)
            .await
            .map_err(|e| e.for_dependency(name, "resolve installed revision"))?;

        let latest = client
            .fetch_latest(&repo)
            .await
            .map_err(|e| e.for_dependency(name, "fetch latest revision"))?;
        if !is_full_hash(&latest.commit) {
            return Err(ReportError::Resolution {
                dependency: name.to_string(),
                identifier: latest.commit,
                reason: "latest revision is not a full commit hash".to_string(),
            });
        }

        let license = client
            .fetch_license(name, &repo)
            .await
            .map_err(|e| e.for_dependency(name, "fetch license"))?;

        let tag = RevisionSpec::parse(&descriptor.version)?
            .tag()
            .map(str::to_string);

        Ok(ReportRecord {
            name: name.to_string(),
            provider,
            license,
            repository_url: repo.website,
            installed: VersionDetails::from_revision(installed, tag),
            latest,
        })
    }

    async fn settle_license_gap(&self, mut record: ReportRecord) -> Result<ReportRecord, ReportError> {
        tracing::warn!(dependency = %record.name, "license info not provided");

        self.notifier
            .notify_license_gap(&self.product, &record.name)
            .await
            .map_err(|source| ReportError::Notification {
                product: self.product.clone(),
                dependency: record.name.clone(),
                source,
            })?;

        record.license = Some(UNKNOWN_LICENSE.to_string());
        Ok(record)
    }
}
