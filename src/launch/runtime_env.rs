//! The job's runtime environment (`--runtime-env-json`).

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::launch::config::LaunchConfig;
use crate::launch::topology::Topology;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEnv {
    pub env_vars: BTreeMap<String, String>,
}

impl RuntimeEnv {
    pub fn for_launch(config: &LaunchConfig, topology: &Topology) -> Self {
        let mut env_vars = BTreeMap::new();
        env_vars.insert("PYTHONPATH".to_string(), config.python_path.clone());
        env_vars.insert("CUDA_DEVICE_MAX_CONNECTIONS".to_string(), "1".to_string());
        let nvls = if topology.has_nvlink() { "1" } else { "0" };
        env_vars.insert("NCCL_NVLS_ENABLE".to_string(), nvls.to_string());
        if let Some(url) = &config.gym_url {
            env_vars.insert("CLAUDE_CODE_GYM_URL".to_string(), url.clone());
        }
        Self { env_vars }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialise runtime env")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn keys(env: &RuntimeEnv) -> Vec<&str> {
        env.env_vars.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_without_gym() {
        let env = RuntimeEnv::for_launch(&LaunchConfig::default(), &Topology { nvlink_count: 0 });
        assert_eq!(
            keys(&env),
            ["CUDA_DEVICE_MAX_CONNECTIONS", "NCCL_NVLS_ENABLE", "PYTHONPATH"]
        );
        assert_eq!(env.env_vars["NCCL_NVLS_ENABLE"], "0");
    }

    #[test]
    fn test_with_gym_and_nvlink() {
        let config = LaunchConfig {
            gym_url: Some("http://gym:12000".into()),
            ..LaunchConfig::default()
        };
        let env = RuntimeEnv::for_launch(&config, &Topology { nvlink_count: 12 });
        assert_eq!(env.env_vars["NCCL_NVLS_ENABLE"], "1");
        assert_eq!(env.env_vars["CLAUDE_CODE_GYM_URL"], "http://gym:12000");

        let parsed: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        let vars = parsed["env_vars"].as_object().unwrap();
        assert_eq!(vars.len(), 4);
        assert_eq!(vars["CUDA_DEVICE_MAX_CONNECTIONS"], "1");
        assert_eq!(vars["PYTHONPATH"], "/root/Megatron-LM/");
        assert_eq!(parsed.as_object().unwrap().len(), 1);
    }
}
