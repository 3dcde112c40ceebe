//! HTTP Prover Client
//!
//! Client for a remote proving service speaking JSON over HTTP.
//!
//! ```text
//! GET  /v1/configuration      → ProverConfiguration
//! GET  /v1/verification-key   → VerificationKey
//! POST /v1/prove (ProofInputs)→ ExtendedProof
//! ```
//!
//! Every response is wrapped in an [`ApiResponse`] envelope. The
//! [`ProverService`] trait is synchronous; the client drives `reqwest` on a
//! private current-thread runtime.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shroud_config::ProverConfig;
use tracing::{debug, info, warn};

use super::{ProofInputs, ProverService};
use crate::error::{ProverError, ProverResult};
use crate::zksnark::{ExtendedProof, ProofSystem, VerificationKey};

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        data: T,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> ProverResult<T> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { message, code } => Err(ProverError::Rejected(format!(
                "({}) {message}",
                code.unwrap_or_else(|| "unknown".to_string())
            ))),
        }
    }
}

/// What the remote service proves for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverConfiguration {
    pub proof_system: ProofSystem,
    pub tree_depth: usize,
}

impl ProverConfiguration {
    /// Fails unless the service proves `system` statements over trees of `tree_depth`
    pub fn ensure_compatible(&self, system: ProofSystem, tree_depth: usize) -> ProverResult<()> {
        if self.proof_system != system {
            return Err(ProverError::InvalidResponse(format!(
                "prover runs {:?}, configured for {system:?}",
                self.proof_system
            )));
        }
        if self.tree_depth != tree_depth {
            return Err(ProverError::InvalidResponse(format!(
                "prover circuit has tree depth {}, wallet uses {tree_depth}",
                self.tree_depth
            )));
        }
        Ok(())
    }
}

/// Client for a remote proving service
pub struct HttpProverClient {
    base_url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    configuration: ProverConfiguration,
}

impl HttpProverClient {
    /// Connects and fetches the service configuration
    pub fn connect(config: &ProverConfig) -> ProverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProverError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProverError::Unavailable(format!("failed to start runtime: {e}")))?;

        let mut this = Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            runtime,
            configuration: ProverConfiguration {
                proof_system: config.proof_system.into(),
                tree_depth: 0,
            },
        };
        this.configuration = this.get("configuration")?;
        info!(
            "Connected to prover at {} ({:?}, depth {})",
            this.base_url, this.configuration.proof_system, this.configuration.tree_depth
        );
        Ok(this)
    }

    pub fn configuration(&self) -> &ProverConfiguration {
        &self.configuration
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/v1/{endpoint}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ProverResult<T> {
        let url = self.url(endpoint);
        debug!("GET {url}");
        self.runtime.block_on(async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ProverError::Unavailable(format!("{url}: {e}")))?;
            Self::decode(response).await
        })
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> ProverResult<T> {
        let url = self.url(endpoint);
        debug!("POST {url}");
        self.runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| ProverError::Unavailable(format!("{url}: {e}")))?;
            Self::decode(response).await
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ProverResult<T> {
        let status = response.status();
        if !status.is_success() && !status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Prover returned {status}: {body}");
            return Err(ProverError::Unavailable(format!("prover returned {status}: {body}")));
        }
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ProverError::InvalidResponse(e.to_string()))?;
        envelope.into_result()
    }
}

impl ProverService for HttpProverClient {
    fn proof_system(&self) -> ProofSystem {
        self.configuration.proof_system
    }

    fn verification_key(&self) -> ProverResult<VerificationKey> {
        let vk: VerificationKey = self.get("verification-key")?;
        if vk.system() != self.configuration.proof_system {
            return Err(ProverError::InvalidResponse(format!(
                "{:?} key from a {:?} prover",
                vk.system(),
                self.configuration.proof_system
            )));
        }
        Ok(vk)
    }

    fn prove(&self, inputs: &ProofInputs) -> ProverResult<ExtendedProof> {
        let start = std::time::Instant::now();
        info!(
            "Requesting proof (v_in={}, v_out={})",
            inputs.pub_in_value, inputs.pub_out_value
        );
        let proof: ExtendedProof = self.post("prove", inputs)?;
        if proof.proof.system() != self.configuration.proof_system {
            return Err(ProverError::InvalidResponse(format!(
                "{:?} proof from a {:?} prover",
                proof.proof.system(),
                self.configuration.proof_system
            )));
        }
        info!("Proof received in {:?}", start.elapsed());
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let json = r#"{"status":"success","data":{"proof_system":"pghr13","tree_depth":32}}"#;
        let resp: ApiResponse<ProverConfiguration> = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.into_result().unwrap(),
            ProverConfiguration {
                proof_system: ProofSystem::Pghr13,
                tree_depth: 32
            }
        );
    }

    #[test]
    fn test_api_response_error() {
        let json = r#"{"status":"error","message":"unsatisfied constraint","code":"E42"}"#;
        let resp: ApiResponse<ProverConfiguration> = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.into_result().unwrap_err(),
            ProverError::Rejected("(E42) unsatisfied constraint".into())
        );
    }

    #[test]
    fn test_configuration_compatibility() {
        let remote = ProverConfiguration {
            proof_system: ProofSystem::Groth16,
            tree_depth: 32,
        };
        assert!(remote.ensure_compatible(ProofSystem::Groth16, 32).is_ok());
        assert!(matches!(
            remote.ensure_compatible(ProofSystem::Pghr13, 32),
            Err(ProverError::InvalidResponse(_))
        ));
        let err = remote.ensure_compatible(ProofSystem::Groth16, 8).unwrap_err();
        assert_eq!(
            err,
            ProverError::InvalidResponse("prover circuit has tree depth 32, wallet uses 8".into())
        );
    }

    #[test]
    fn test_connect_refused() {
        let config = ProverConfig {
            mode: shroud_config::ProverMode::Http,
            url: "http://127.0.0.1:1".into(),
            timeout_secs: 1,
            ..Default::default()
        };
        assert!(matches!(
            HttpProverClient::connect(&config),
            Err(ProverError::Unavailable(_))
        ));
    }
}
