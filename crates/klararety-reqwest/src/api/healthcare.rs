//! Medical record endpoints.

use klararety_core::Result;
use klararety_core::types::{
    Allergy, Condition, Immunization, LabResult, LabTest, MedicalRecord, Medication, UserId,
    VitalSign,
};

use crate::ApiClient;

/// Filter for vital-sign listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VitalSignQuery {
    pub medical_record: Option<u64>,
    /// Restrict to these measurement ids, e.g. the entries saved by a device sync.
    pub measurement_ids: Vec<u64>,
}

impl VitalSignQuery {
    /// Returns the query parameters of this filter.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(record) = self.medical_record {
            pairs.push(("medical_record", record.to_string()));
        }
        if !self.measurement_ids.is_empty() {
            let ids: Vec<String> = self.measurement_ids.iter().map(u64::to_string).collect();
            pairs.push(("measurement_ids", ids.join(",")));
        }
        pairs
    }
}

fn by_record(record: u64) -> [(&'static str, String); 1] {
    [("medical_record", record.to_string())]
}

impl ApiClient {
    pub async fn medical_record(&self, id: u64) -> Result<MedicalRecord> {
        self.get(&format!("healthcare/medical-records/{id}/")).await
    }

    /// Lists the medical records of a patient.
    pub async fn medical_records(&self, patient: UserId) -> Result<Vec<MedicalRecord>> {
        self.list(
            "healthcare/medical-records/",
            &[("patient", patient.to_string())],
        )
        .await
    }

    pub async fn medications(&self, medical_record: u64) -> Result<Vec<Medication>> {
        self.list("healthcare/medications/", &by_record(medical_record))
            .await
    }

    pub async fn allergies(&self, medical_record: u64) -> Result<Vec<Allergy>> {
        self.list("healthcare/allergies/", &by_record(medical_record))
            .await
    }

    pub async fn conditions(&self, medical_record: u64) -> Result<Vec<Condition>> {
        self.list("healthcare/conditions/", &by_record(medical_record))
            .await
    }

    pub async fn immunizations(&self, medical_record: u64) -> Result<Vec<Immunization>> {
        self.list("healthcare/immunizations/", &by_record(medical_record))
            .await
    }

    pub async fn lab_tests(&self, medical_record: u64) -> Result<Vec<LabTest>> {
        self.list("healthcare/lab-tests/", &by_record(medical_record))
            .await
    }

    /// Lists the results of one lab test.
    pub async fn lab_results(&self, lab_test: u64) -> Result<Vec<LabResult>> {
        self.list(
            "healthcare/lab-results/",
            &[("lab_test", lab_test.to_string())],
        )
        .await
    }

    pub async fn vital_signs(&self, query: &VitalSignQuery) -> Result<Vec<VitalSign>> {
        self.list("healthcare/vital-signs/", &query.query_pairs())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{TestServer, client_for};

    #[test]
    fn test_vital_sign_query_pairs() {
        let query = VitalSignQuery {
            medical_record: None,
            measurement_ids: vec![3, 9, 12],
        };
        assert_eq!(
            query.query_pairs(),
            vec![("measurement_ids", "3,9,12".to_owned())]
        );
        assert!(VitalSignQuery::default().query_pairs().is_empty());
    }

    #[tokio::test]
    async fn test_record_scoped_listings() {
        let server = TestServer::start(vec![
            (
                "/api/healthcare/medical-records/",
                200,
                r#"[{"id": 11, "patient": 4}]"#,
            ),
            (
                "/api/healthcare/medications/",
                200,
                r#"[{"id": 1, "name": "Lisinopril", "active": true}, {"id": 2, "name": "Old", "active": false}]"#,
            ),
        ])
        .await;
        let (client, _, _) = client_for(&server);

        let records = client.medical_records(UserId(4)).await.unwrap();
        assert_eq!(records[0].id, 11);
        assert_eq!(
            server.last_request().unwrap().target,
            "/api/healthcare/medical-records/?patient=4"
        );

        let medications = client.medications(11).await.unwrap();
        assert_eq!(medications.len(), 2);
        assert_eq!(
            server.last_request().unwrap().target,
            "/api/healthcare/medications/?medical_record=11"
        );
    }
}
