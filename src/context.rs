//! Trust-chain and revocation discovery.
//!
//! A [`ValidationContext`] collects every certificate, CRL and OCSP response needed
//! to trust one target at one validation date. Discovery is a fixed-point worklist:
//!
//! 1. The target is seeded as the first token.
//! 2. Each pass takes the tokens without revocation data, in insertion order.
//! 3. For each one the issuer is searched in the trusted list, in the token's own
//!    certificate bag and in the external source. Candidates must match the signer
//!    name, be valid at the validation date, sit inside their trusted-list service
//!    window and verify the token signature. [`IssuerSelection`] picks among the
//!    survivors.
//! 4. A found issuer becomes a new token. Self-signed and trusted-list
//!    certificates are marked as needing no revocation check on insertion.
//! 5. Certificates get an OCSP/CRL status; the CRL or OCSP response that proves it
//!    becomes a new token. Other token kinds only record their issuer.
//! 6. Passes repeat until one produces no growth.
//!
//! Tokens live in an arena addressed by [`TokenHandle`] and are deduplicated by
//! their content-derived [`TokenKey`]. The context is owned by the call that built
//! it; it is append-only while discovering and read-only afterwards.
//!
//! [`IssuerSelection`]: crate::config::IssuerSelection

use crate::config::ValidationConfig;
use crate::crypto::CryptoProvider;
use crate::error::{Error, Result};
use crate::sources::{
    CertificateAndContext, CertificateSource, CertificateSourceType, CrlSource, ListCrlSource,
    ListOcspSource, OcspSource, ServiceInfo,
};
use crate::status::{CertificateStatus, CertificateStatusVerifier, OcspAndCrlCertificateVerifier};
use crate::status::CertificateValidity;
use crate::tokens::{Certificate, Crl, OcspResponse, SignedObject, SignedToken, TimestampToken, TokenKey};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a token inside a [`ValidationContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenHandle(usize);

impl TokenHandle {
    /// Position in the arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a token needs no revocation evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoCheckReason {
    /// Subject equals issuer
    SelfSigned,
    /// Published in a trusted list
    TrustedList,
}

/// Why a token could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnresolvedReason {
    /// No candidate passed the issuer filters
    IssuerNotFound,
    /// Neither OCSP nor CRL produced an answer
    NoRevocationData,
}

/// Per-token verdict. Set once; never overwritten.
#[derive(Debug, Clone)]
pub enum RevocationData {
    /// Self-signed or trusted-list certificate
    NoCheckNeeded(NoCheckReason),
    /// Issuer or revocation evidence could not be found
    Unresolved {
        /// The issuer, when only the revocation evidence is missing
        issuer: Option<TokenHandle>,
        /// Cause
        reason: UnresolvedReason,
    },
    /// Issuer found and, for certificates, a status obtained
    Checked {
        /// The issuer token
        issuer: TokenHandle,
        /// Certificate status (certificates only)
        status: Option<CertificateStatus>,
        /// Token of the CRL or OCSP response backing the status
        evidence: Option<TokenHandle>,
    },
}

impl RevocationData {
    /// The issuer recorded for the token.
    pub fn issuer(&self) -> Option<TokenHandle> {
        match self {
            RevocationData::NoCheckNeeded(_) => None,
            RevocationData::Unresolved { issuer, .. } => *issuer,
            RevocationData::Checked { issuer, .. } => Some(*issuer),
        }
    }

    /// The certificate status, if one was obtained.
    pub fn status(&self) -> Option<&CertificateStatus> {
        match self {
            RevocationData::Checked { status, .. } => status.as_ref(),
            _ => None,
        }
    }

    /// Whether discovery gave up on this token.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, RevocationData::Unresolved { .. })
    }

    /// Whether the token was short-circuited.
    pub fn is_no_check_needed(&self) -> bool {
        matches!(self, RevocationData::NoCheckNeeded(_))
    }

    /// Whether the certificate status says revoked.
    pub fn is_revoked(&self) -> bool {
        self.status()
            .map_or(false, |s| s.validity == CertificateValidity::Revoked)
    }
}

/// Evidence sources and crypto used by discovery.
#[derive(Clone, Copy)]
pub struct ValidationSources<'a> {
    /// Crypto provider
    pub crypto: &'a dyn CryptoProvider,
    /// Trusted-list certificates
    pub trusted_list: Option<&'a dyn CertificateSource>,
    /// Additional certificates (embedded, AIA)
    pub external: Option<&'a dyn CertificateSource>,
    /// CRL source
    pub crl: Option<&'a dyn CrlSource>,
    /// OCSP source
    pub ocsp: Option<&'a dyn OcspSource>,
}

impl<'a> ValidationSources<'a> {
    /// Sources with only a crypto provider.
    pub fn new(crypto: &'a dyn CryptoProvider) -> Self {
        Self {
            crypto,
            trusted_list: None,
            external: None,
            crl: None,
            ocsp: None,
        }
    }

    /// Set the trusted list.
    pub fn with_trusted_list(mut self, source: &'a dyn CertificateSource) -> Self {
        self.trusted_list = Some(source);
        self
    }

    /// Set the external certificate source.
    pub fn with_external(mut self, source: &'a dyn CertificateSource) -> Self {
        self.external = Some(source);
        self
    }

    /// Set the CRL source.
    pub fn with_crl_source(mut self, source: &'a dyn CrlSource) -> Self {
        self.crl = Some(source);
        self
    }

    /// Set the OCSP source.
    pub fn with_ocsp_source(mut self, source: &'a dyn OcspSource) -> Self {
        self.ocsp = Some(source);
        self
    }
}

#[derive(Debug, Clone)]
struct TokenEntry {
    token: SignedToken,
    source_type: CertificateSourceType,
    service: Option<ServiceInfo>,
    data: Option<RevocationData>,
}

/// Evidence discovery for one target at one validation date.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    validation_date: DateTime<Utc>,
    tokens: Vec<TokenEntry>,
    index: HashMap<TokenKey, TokenHandle>,
    needed_certificates: IndexMap<TokenKey, TokenHandle>,
    needed_crls: IndexMap<TokenKey, Arc<Crl>>,
    needed_ocsp_responses: IndexMap<TokenKey, Arc<OcspResponse>>,
    passes: usize,
}

impl ValidationContext {
    /// Create a context whose target is `certificate`.
    pub fn new(certificate: Arc<Certificate>, validation_date: DateTime<Utc>) -> Self {
        Self::for_token(SignedToken::Certificate(certificate), validation_date)
    }

    /// Create a context whose target is a timestamp token.
    pub fn for_timestamp(timestamp: Arc<TimestampToken>, validation_date: DateTime<Utc>) -> Self {
        Self::for_token(SignedToken::Timestamp(timestamp), validation_date)
    }

    /// Create a context whose target is any signed token.
    pub fn for_token(target: SignedToken, validation_date: DateTime<Utc>) -> Self {
        let mut context = Self {
            validation_date,
            tokens: Vec::new(),
            index: HashMap::new(),
            needed_certificates: IndexMap::new(),
            needed_crls: IndexMap::new(),
            needed_ocsp_responses: IndexMap::new(),
            passes: 0,
        };
        context.insert(target, CertificateSourceType::Other, None);
        context
    }

    /// Validation date.
    pub fn validation_date(&self) -> DateTime<Utc> {
        self.validation_date
    }

    /// Handle of the target token.
    pub fn target(&self) -> TokenHandle {
        TokenHandle(0)
    }

    /// The target token.
    pub fn target_token(&self) -> &SignedToken {
        &self.tokens[0].token
    }

    /// The target certificate, when the target is one.
    pub fn target_certificate(&self) -> Option<&Arc<Certificate>> {
        self.tokens[0].token.as_certificate()
    }

    /// Number of tokens in the worklist.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false: the target is always present.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens carrying revocation data.
    pub fn validated_count(&self) -> usize {
        self.tokens.iter().filter(|e| e.data.is_some()).count()
    }

    /// Number of discovery passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Token at `handle`.
    pub fn token(&self, handle: TokenHandle) -> Option<&SignedToken> {
        self.tokens.get(handle.0).map(|e| &e.token)
    }

    /// Handle of `token`, if present.
    pub fn handle_of(&self, token: &SignedToken) -> Option<TokenHandle> {
        self.index.get(&token.key()).copied()
    }

    /// All tokens in insertion order.
    pub fn tokens(&self) -> impl Iterator<Item = (TokenHandle, &SignedToken)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, e)| (TokenHandle(i), &e.token))
    }

    /// Revocation data recorded for `handle`.
    pub fn revocation_data_of(&self, handle: TokenHandle) -> Option<&RevocationData> {
        self.tokens.get(handle.0).and_then(|e| e.data.as_ref())
    }

    /// Revocation data recorded for `token`.
    pub fn revocation_data(&self, token: &SignedToken) -> Option<&RevocationData> {
        self.handle_of(token)
            .and_then(|handle| self.revocation_data_of(handle))
    }

    /// Revocation data recorded for a certificate.
    pub fn revocation_data_for_certificate(&self, certificate: &Certificate) -> Option<&RevocationData> {
        self.certificate_handle(certificate)
            .and_then(|handle| self.revocation_data_of(handle))
    }

    /// Certificates needed to trust the target (the target itself excluded).
    pub fn needed_certificates(&self) -> impl Iterator<Item = CertificateAndContext> + '_ {
        self.needed_certificates
            .values()
            .filter_map(|handle| self.certificate_and_context(*handle))
    }

    /// CRLs needed to trust the target.
    pub fn needed_crls(&self) -> impl Iterator<Item = &Arc<Crl>> + '_ {
        self.needed_crls.values()
    }

    /// OCSP responses needed to trust the target.
    pub fn needed_ocsp_responses(&self) -> impl Iterator<Item = &Arc<OcspResponse>> + '_ {
        self.needed_ocsp_responses.values()
    }

    /// Certificate at `handle` with its provenance.
    pub fn certificate_and_context(&self, handle: TokenHandle) -> Option<CertificateAndContext> {
        let entry = self.tokens.get(handle.0)?;
        let certificate = entry.token.as_certificate()?;
        Some(CertificateAndContext {
            certificate: certificate.clone(),
            source_type: entry.source_type,
            service: entry.service.clone(),
        })
    }

    /// Add a token to the worklist. Adding an existing token returns its handle.
    pub fn add_token(&mut self, token: SignedToken) -> TokenHandle {
        self.insert(token, CertificateSourceType::Other, None)
    }

    /// Add a certificate with its provenance.
    pub fn add_certificate(&mut self, certificate: CertificateAndContext) -> TokenHandle {
        self.insert(
            SignedToken::Certificate(certificate.certificate),
            certificate.source_type,
            certificate.service,
        )
    }

    /// Record the verdict for `handle`.
    ///
    /// The handle must come from this context, and data can be recorded once.
    pub fn record_revocation_data(&mut self, handle: TokenHandle, data: RevocationData) -> Result<()> {
        let entry = self
            .tokens
            .get_mut(handle.0)
            .ok_or(Error::UnknownToken(handle.0))?;
        if entry.data.is_some() {
            return Err(Error::RevocationDataAlreadySet(handle.0));
        }
        entry.data = Some(data);
        Ok(())
    }

    /// Run discovery to its fixed point.
    pub fn validate(&mut self, sources: &ValidationSources<'_>, config: &ValidationConfig) -> Result<()> {
        loop {
            let before = (self.len(), self.validated_count());
            self.run_pass(sources, config)?;
            self.passes += 1;
            let after = (self.len(), self.validated_count());
            log::debug!(
                "Discovery pass {}: {} tokens, {} validated",
                self.passes,
                after.0,
                after.1
            );
            if after == before {
                break;
            }
            if self.passes >= config.max_passes {
                log::warn!(
                    "Stopping discovery after {} passes with {} unvalidated tokens",
                    self.passes,
                    self.len() - self.validated_count()
                );
                break;
            }
        }
        log::info!(
            "Discovery for {} finished: {} certificates, {} CRLs, {} OCSP responses",
            self.target_token(),
            self.needed_certificates.len(),
            self.needed_crls.len(),
            self.needed_ocsp_responses.len()
        );
        Ok(())
    }

    /// Issuer of `certificate` among the discovered tokens.
    ///
    /// Uses the issuer recorded during discovery, and falls back to a subject name
    /// match for certificates the worklist did not process.
    pub fn issuer_from_context(&self, certificate: &Certificate) -> Option<CertificateAndContext> {
        if let Some(handle) = self.certificate_handle(certificate) {
            let recorded = self.revocation_data_of(handle).and_then(|d| d.issuer());
            if let Some(issuer) = recorded {
                return self.certificate_and_context(issuer);
            }
        }
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.token
                    .as_certificate()
                    .map_or(false, |c| c.subject == certificate.issuer)
            })
            .find_map(|(i, _)| self.certificate_and_context(TokenHandle(i)))
    }

    /// The first trusted-list ancestor of `certificate`.
    pub fn parent_from_trusted_list(&self, certificate: &Certificate) -> Option<CertificateAndContext> {
        let mut current = certificate.clone();
        for _ in 0..=self.tokens.len() {
            let issuer = self.issuer_from_context(&current)?;
            if issuer.is_trusted_list() {
                return Some(issuer);
            }
            if *issuer.certificate == current {
                return None;
            }
            current = issuer.certificate.as_ref().clone();
        }
        None
    }

    /// Status of `certificate` computed from the evidence collected here.
    ///
    /// Trusted-list certificates are VALID without any lookup. Other certificates
    /// run the OCSP/CRL chain against the context's CRLs and OCSP responses; nothing
    /// is fetched.
    pub fn certificate_status_from_context(
        &self,
        certificate: &Certificate,
        crypto: &dyn CryptoProvider,
    ) -> Option<CertificateStatus> {
        let handle = self.certificate_handle(certificate);
        let certificate = match handle.and_then(|h| self.tokens[h.0].token.as_certificate()) {
            Some(cert) => cert.clone(),
            None => Arc::new(certificate.clone()),
        };

        if let Some(entry) = handle.and_then(|h| self.certificate_and_context(h)) {
            if entry.is_trusted_list() {
                return Some(CertificateStatus {
                    certificate,
                    issuer_certificate: None,
                    validity: CertificateValidity::Valid,
                    status_source: None,
                    revocation_date: None,
                    validation_date: self.validation_date,
                });
            }
        }

        let issuer = self.issuer_from_context(&certificate)?;
        let crls = ListCrlSource::new(self.needed_crls.values().cloned());
        let responses = ListOcspSource::new(self.needed_ocsp_responses.values().cloned());
        OcspAndCrlCertificateVerifier::new(Some(&responses), Some(&crls), crypto).check(
            &certificate,
            &issuer.certificate,
            self.validation_date,
        )
    }

    /// Certificate chain from the target up to the last discovered issuer.
    ///
    /// For a timestamp target the chain starts at the TSA certificate.
    pub fn chain(&self) -> Vec<CertificateAndContext> {
        let mut chain = Vec::new();
        let mut handle = Some(self.target());
        if self.target_certificate().is_none() {
            handle = self.revocation_data_of(self.target()).and_then(|d| d.issuer());
        }
        while let Some(current) = handle {
            if chain.len() > self.tokens.len() {
                break;
            }
            let Some(entry) = self.certificate_and_context(current) else {
                break;
            };
            let next = self.revocation_data_of(current).and_then(|d| d.issuer());
            chain.push(entry);
            handle = next.filter(|n| *n != current);
        }
        chain
    }

    fn certificate_handle(&self, certificate: &Certificate) -> Option<TokenHandle> {
        let key = TokenKey::Certificate {
            issuer: certificate.issuer.normalized().into_owned(),
            serial: certificate.serial.clone(),
        };
        self.index.get(&key).copied()
    }

    fn insert(
        &mut self,
        token: SignedToken,
        source_type: CertificateSourceType,
        service: Option<ServiceInfo>,
    ) -> TokenHandle {
        let key = token.key();
        if let Some(existing) = self.index.get(&key) {
            return *existing;
        }

        let handle = TokenHandle(self.tokens.len());
        let data = match &token {
            SignedToken::Certificate(cert) if cert.is_self_signed() => {
                Some(RevocationData::NoCheckNeeded(NoCheckReason::SelfSigned))
            },
            SignedToken::Certificate(_) if source_type == CertificateSourceType::TrustedList => {
                Some(RevocationData::NoCheckNeeded(NoCheckReason::TrustedList))
            },
            _ => None,
        };

        // The target is not part of its own evidence.
        if handle.0 > 0 {
            match &token {
                SignedToken::Certificate(_) => {
                    self.needed_certificates.insert(key.clone(), handle);
                },
                SignedToken::Crl(crl) => {
                    self.needed_crls.insert(key.clone(), crl.clone());
                },
                SignedToken::Ocsp(ocsp) => {
                    self.needed_ocsp_responses.insert(key.clone(), ocsp.clone());
                },
                SignedToken::Timestamp(_) => {},
            }
        }

        log::debug!("Worklist {}: added {} ({:?})", handle, token, source_type);
        self.tokens.push(TokenEntry {
            token,
            source_type,
            service,
            data,
        });
        self.index.insert(key, handle);
        handle
    }

    fn run_pass(&mut self, sources: &ValidationSources<'_>, config: &ValidationConfig) -> Result<()> {
        let pending: Vec<TokenHandle> = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, e)| e.data.is_none())
            .map(|(i, _)| TokenHandle(i))
            .collect();

        for handle in pending {
            if self.tokens[handle.0].data.is_none() {
                self.process(handle, sources, config)?;
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        handle: TokenHandle,
        sources: &ValidationSources<'_>,
        config: &ValidationConfig,
    ) -> Result<()> {
        let token = self.tokens[handle.0].token.clone();

        let Some(issuer) = self.resolve_issuer(&token, sources, config) else {
            log::info!("No issuer found for {}", token);
            return self.record_revocation_data(
                handle,
                RevocationData::Unresolved {
                    issuer: None,
                    reason: UnresolvedReason::IssuerNotFound,
                },
            );
        };

        let issuer_certificate = issuer.certificate.clone();
        let issuer_handle = self.add_certificate(issuer);

        let data = match &token {
            SignedToken::Certificate(certificate) => {
                let verifier =
                    OcspAndCrlCertificateVerifier::new(sources.ocsp, sources.crl, sources.crypto);
                match verifier.check(certificate, &issuer_certificate, self.validation_date) {
                    Some(status) => {
                        let evidence = status
                            .status_source
                            .as_ref()
                            .map(|source| self.add_token(source.to_token()));
                        RevocationData::Checked {
                            issuer: issuer_handle,
                            status: Some(status),
                            evidence,
                        }
                    },
                    None => {
                        log::info!("No revocation data for {}", token);
                        RevocationData::Unresolved {
                            issuer: Some(issuer_handle),
                            reason: UnresolvedReason::NoRevocationData,
                        }
                    },
                }
            },
            SignedToken::Crl(_) | SignedToken::Ocsp(_) | SignedToken::Timestamp(_) => {
                RevocationData::Checked {
                    issuer: issuer_handle,
                    status: None,
                    evidence: None,
                }
            },
        };
        self.record_revocation_data(handle, data)
    }

    fn resolve_issuer(
        &self,
        token: &SignedToken,
        sources: &ValidationSources<'_>,
        config: &ValidationConfig,
    ) -> Option<CertificateAndContext> {
        let name = token.signer_subject_name()?;
        let wrapped = token.wrapped_certificate_source();

        let mut candidates = Vec::new();
        if let Some(trusted_list) = sources.trusted_list {
            candidates.extend(trusted_list.by_subject_name(&name));
        }
        candidates.extend(wrapped.by_subject_name(&name));
        if let Some(external) = sources.external {
            candidates.extend(external.by_subject_name(&name));
        }

        let date = self.validation_date;
        let survivors: Vec<CertificateAndContext> = candidates
            .into_iter()
            .filter(|c| {
                let valid = c.certificate.is_valid_at(date);
                if !valid {
                    log::debug!("Issuer candidate '{}' expired at {}", c.certificate.subject, date);
                }
                valid
            })
            .filter(|c| !config.check_service_window || c.service_active_at(date))
            .filter(|c| token.is_signed_by(&c.certificate, sources.crypto))
            .collect();

        log::debug!("{} issuer candidates for {}", survivors.len(), token);
        config.issuer_selection.select(survivors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignatureAlgorithm;
    use crate::tokens::{DistinguishedName, SerialNumber};
    use chrono::TimeZone;

    fn certificate(subject: &str, issuer: &str, serial: u64) -> Arc<Certificate> {
        Arc::new(Certificate {
            der: format!("{}/{}/{}", subject, issuer, serial).into_bytes(),
            subject: DistinguishedName::new(subject),
            issuer: DistinguishedName::new(issuer),
            serial: SerialNumber::from_u64(serial),
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            public_key_der: Vec::new(),
            tbs: Vec::new(),
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature: Vec::new(),
            qc_statements: Vec::new(),
        })
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_target_is_first_token() {
        let leaf = certificate("CN=Leaf", "CN=CA", 2);
        let context = ValidationContext::new(leaf.clone(), date());
        assert_eq!(context.target(), TokenHandle(0));
        assert_eq!(context.target_certificate().map(|c| c.der.clone()), Some(leaf.der.clone()));
        assert_eq!(context.len(), 1);
        assert!(!context.is_empty());
        assert_eq!(context.validated_count(), 0);
        assert_eq!(context.needed_certificates().count(), 0);
    }

    #[test]
    fn test_add_token_deduplicates() {
        let mut context = ValidationContext::new(certificate("CN=Leaf", "CN=CA", 2), date());
        let ca = certificate("CN=CA", "CN=Root", 1);
        let first = context.add_token(SignedToken::Certificate(ca.clone()));
        let second = context.add_token(SignedToken::Certificate(ca));
        assert_eq!(first, second);
        assert_eq!(context.len(), 2);
        assert_eq!(first.to_string(), "#1");
    }

    #[test]
    fn test_self_signed_and_trusted_are_marked_on_insertion() {
        let mut context = ValidationContext::new(certificate("CN=Leaf", "CN=CA", 2), date());
        let root = context.add_token(SignedToken::Certificate(certificate("CN=Root", "CN=Root", 1)));
        assert!(matches!(
            context.revocation_data_of(root),
            Some(RevocationData::NoCheckNeeded(NoCheckReason::SelfSigned))
        ));

        let ca = CertificateAndContext {
            certificate: certificate("CN=CA", "CN=Root", 3),
            source_type: CertificateSourceType::TrustedList,
            service: None,
        };
        let ca = context.add_certificate(ca);
        assert!(matches!(
            context.revocation_data_of(ca),
            Some(RevocationData::NoCheckNeeded(NoCheckReason::TrustedList))
        ));
    }

    #[test]
    fn test_revocation_data_is_set_once() {
        let mut context = ValidationContext::new(certificate("CN=Leaf", "CN=CA", 2), date());
        let target = context.target();
        let unresolved = RevocationData::Unresolved {
            issuer: None,
            reason: UnresolvedReason::IssuerNotFound,
        };

        context.record_revocation_data(target, unresolved.clone()).unwrap();
        assert!(matches!(
            context.record_revocation_data(target, unresolved.clone()),
            Err(Error::RevocationDataAlreadySet(0))
        ));
        assert!(matches!(
            context.record_revocation_data(TokenHandle(9), unresolved),
            Err(Error::UnknownToken(9))
        ));
        assert_eq!(context.validated_count(), 1);
    }

    #[test]
    fn test_revocation_data_accessors() {
        let checked = RevocationData::Checked {
            issuer: TokenHandle(1),
            status: None,
            evidence: None,
        };
        assert_eq!(checked.issuer(), Some(TokenHandle(1)));
        assert!(!checked.is_unresolved());
        assert!(!checked.is_revoked());

        let skipped = RevocationData::NoCheckNeeded(NoCheckReason::SelfSigned);
        assert_eq!(skipped.issuer(), None);
        assert!(skipped.is_no_check_needed());
    }

    #[test]
    fn test_issuer_from_context_falls_back_to_subject_match() {
        let leaf = certificate("CN=Leaf", "CN=CA", 2);
        let ca = certificate("CN=CA", "CN=Root", 1);
        let mut context = ValidationContext::new(leaf.clone(), date());
        context.add_token(SignedToken::Certificate(ca.clone()));

        let issuer = context.issuer_from_context(&leaf).map(|c| c.certificate.der.clone());
        assert_eq!(issuer, Some(ca.der.clone()));
    }
}
