use async_trait::async_trait;
use octofhir_validation_support::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[allow(dead_code)]
pub const CUSTOM_CLAIM_URL: &str = "https://ig.example.org/fhir/StructureDefinition/hcx-claim";

#[allow(dead_code)]
pub fn custom_claim_profile() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": CUSTOM_CLAIM_URL,
        "version": "0.7.0",
        "name": "HcxClaim",
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": "Claim",
        "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Claim",
        "derivation": "constraint",
        "snapshot": {"element": [
            {"id": "Claim", "path": "Claim", "min": 0, "max": "*"},
            {"id": "Claim.id", "path": "Claim.id", "min": 0, "max": "1", "type": [{"code": "id"}]},
            {"id": "Claim.meta", "path": "Claim.meta", "min": 0, "max": "1", "type": [{"code": "Meta"}]},
            {"id": "Claim.identifier", "path": "Claim.identifier", "min": 1, "max": "1",
             "base": {"path": "Claim.identifier", "min": 0, "max": "*"},
             "type": [{"code": "Identifier"}]},
            {"id": "Claim.status", "path": "Claim.status", "min": 1, "max": "1", "type": [{"code": "code"}],
             "binding": {"strength": "required", "valueSet": "http://hl7.org/fhir/ValueSet/fm-status|4.0.1"}},
            {"id": "Claim.type", "path": "Claim.type", "min": 1, "max": "1",
             "type": [{"code": "CodeableConcept"}],
             "binding": {"strength": "extensible", "valueSet": "http://hl7.org/fhir/ValueSet/claim-type"}},
            {"id": "Claim.use", "path": "Claim.use", "min": 1, "max": "1", "type": [{"code": "code"}],
             "fixedCode": "claim"},
            {"id": "Claim.patient", "path": "Claim.patient", "min": 1, "max": "1",
             "type": [{"code": "Reference"}]},
            {"id": "Claim.created", "path": "Claim.created", "min": 1, "max": "1",
             "type": [{"code": "dateTime"}]},
            {"id": "Claim.provider", "path": "Claim.provider", "min": 1, "max": "1",
             "type": [{"code": "Reference"}]},
            {"id": "Claim.priority", "path": "Claim.priority", "min": 1, "max": "1",
             "type": [{"code": "CodeableConcept"}]},
            {"id": "Claim.insurance", "path": "Claim.insurance", "min": 1, "max": "*",
             "type": [{"code": "BackboneElement"}]},
            {"id": "Claim.insurance.sequence", "path": "Claim.insurance.sequence", "min": 1, "max": "1",
             "type": [{"code": "positiveInt"}]},
            {"id": "Claim.insurance.focal", "path": "Claim.insurance.focal", "min": 1, "max": "1",
             "type": [{"code": "boolean"}]},
            {"id": "Claim.insurance.coverage", "path": "Claim.insurance.coverage", "min": 1, "max": "1",
             "type": [{"code": "Reference"}]}
        ]}
    })
}

/// Claim conforming to both the base definition and the custom profile
/// (apart from `meta`, which the caller adds when needed).
#[allow(dead_code)]
pub fn valid_claim() -> Value {
    json!({
        "resourceType": "Claim",
        "id": "claim-1",
        "identifier": [{"system": "https://hospital.example.org/claims", "value": "CLM-0001"}],
        "status": "active",
        "type": {"coding": [{
            "system": "http://terminology.hl7.org/CodeSystem/claim-type",
            "code": "institutional"
        }]},
        "use": "claim",
        "patient": {"reference": "Patient/p1"},
        "created": "2024-05-10T09:30:00+05:30",
        "provider": {"reference": "Organization/hospital-1"},
        "priority": {"coding": [{"code": "normal"}]},
        "insurance": [
            {"sequence": 1, "focal": true, "coverage": {"reference": "Coverage/cov-1"}}
        ]
    })
}

#[allow(dead_code)]
pub fn valid_patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p1",
        "active": true,
        "name": [{"family": "Sharma", "given": ["Asha"]}],
        "gender": "female",
        "birthDate": "1990-04-12"
    })
}

/// Engine over the standard chain with the given custom definitions.
#[allow(dead_code)]
pub fn engine_with(definitions: Vec<Value>) -> ValidationEngine {
    let custom = PrePopulatedProvider::builder()
        .structure_definitions(
            definitions
                .into_iter()
                .map(|value| StructureDefinition::from_value(value, "test").unwrap()),
        )
        .build();
    let chain = SupportChain::standard(BaseDefinitionProvider::new().unwrap(), custom).unwrap();
    ValidationEngine::new(
        Arc::new(CachingValidationSupport::new(chain)),
        &ValidationOptions::default(),
    )
    .unwrap()
}

/// In-memory source that counts loads and can be told to fail.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct FakeSource {
    payloads: HashMap<String, Vec<u8>>,
    delay: Duration,
    loads: AtomicUsize,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, location: &str, definition: &Value) -> Self {
        self.payloads
            .insert(location.to_string(), serde_json::to_vec(definition).unwrap());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefinitionSource for FakeSource {
    async fn load_raw(&self, location: &str) -> Result<Vec<u8>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ValidatorError::fetch(location, "connection refused"));
        }
        self.payloads
            .get(location)
            .cloned()
            .ok_or_else(|| ValidatorError::fetch(location, "server responded with HTTP 404 Not Found"))
    }
}
