//! Launch configuration.
//!
//! Loaded from an optional JSON file, then patched from the environment
//! (`MASTER_ADDR`, `CUDA_VISIBLE_DEVICES`, `CLAUDE_CODE_GYM_URL`,
//! `WANDB_API_KEY`, `RUN_ID`).

use serde::{Deserialize, Serialize};

/// Everything needed to bring up the cluster head and submit the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Address the cluster head binds to (default: "127.0.0.1").
    pub master_addr: String,
    /// GPUs offered by this node (default: 8).
    pub num_gpus: usize,
    /// Device list when restricted; also determines `num_gpus`.
    pub cuda_visible_devices: Option<String>,
    /// Job submission endpoint (default: "http://127.0.0.1:8265").
    pub dashboard_address: String,
    /// Interpreter for the training entry point (default: "python3").
    pub python: String,
    /// Training entry point (default: "train.py").
    pub entry_point: String,
    /// `PYTHONPATH` for the job (default: "/root/Megatron-LM/").
    pub python_path: String,
    /// Gym server location; enables the agent flag group.
    pub gym_url: Option<String>,
    /// Enables the wandb flag group.
    pub wandb_api_key: Option<String>,
    pub wandb_project: String,
    /// Run identifier (default: UTC start time, `YYYYmmdd_HHMMSS`).
    pub run_id: String,
    /// Process name patterns killed before launch.
    pub cleanup_patterns: Vec<String>,
    /// Pause after cleanup in seconds (default: 3).
    pub cleanup_grace_secs: u64,

    pub model: ModelArgs,
    pub checkpoint: CheckpointArgs,
    pub rollout: RolloutArgs,
    pub optimizer: OptimizerArgs,
    pub grpo: GrpoArgs,
    pub perf: PerfArgs,
    pub sglang: SglangArgs,
    pub agent: AgentArgs,
}

/// Architecture flags, passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelArgs {
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointArgs {
    pub hf_checkpoint: String,
    pub ref_load: String,
    pub load: Option<String>,
    pub save: Option<String>,
    pub save_interval: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutArgs {
    /// JSONL of task records (`prompt`, `metadata`, `label`).
    pub prompt_data: String,
    pub num_rollout: usize,
    pub rollout_batch_size: usize,
    pub n_samples_per_prompt: usize,
    pub max_response_len: usize,
    pub temperature: f64,
    pub global_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerArgs {
    pub lr: f64,
    pub lr_decay_style: String,
    pub weight_decay: f64,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
}

/// RL objective settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpoArgs {
    pub use_kl_loss: bool,
    pub kl_loss_coef: f64,
    pub kl_loss_type: String,
    pub entropy_coef: f64,
    pub eps_clip: f64,
    pub eps_clip_high: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfArgs {
    pub tensor_parallel: usize,
    pub pipeline_parallel: usize,
    pub context_parallel: usize,
    pub sequence_parallel: bool,
    pub recompute: bool,
    pub max_tokens_per_gpu: usize,
}

/// Inference engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SglangArgs {
    pub gpus_per_engine: usize,
    pub mem_fraction_static: f64,
}

/// Hooks wiring the trainer to the gym.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentArgs {
    /// Python module providing `generate`, `reward_func`, `dynamic_filter`
    /// and `generate_rollout`.
    pub hook_module: String,
    pub max_turns: usize,
    pub max_tool_calls: usize,
}

pub fn default_run_id() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

impl LaunchConfig {
    /// Apply the environment overrides on top of the loaded values.
    pub fn from_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are treated as unset.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = get("MASTER_ADDR") {
            self.master_addr = addr;
        }
        if let Some(devices) = get("CUDA_VISIBLE_DEVICES") {
            self.num_gpus = count_devices(&devices);
            self.cuda_visible_devices = Some(devices);
        }
        if let Some(url) = get("CLAUDE_CODE_GYM_URL") {
            self.gym_url = Some(url);
        }
        if let Some(key) = get("WANDB_API_KEY") {
            self.wandb_api_key = Some(key);
        }
        if let Some(run_id) = get("RUN_ID") {
            self.run_id = run_id;
        }
        self
    }
}

/// Number of entries in a `CUDA_VISIBLE_DEVICES` list.
fn count_devices(devices: &str) -> usize {
    devices.split(',').filter(|d| !d.trim().is_empty()).count()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            master_addr: "127.0.0.1".into(),
            num_gpus: 8,
            cuda_visible_devices: None,
            dashboard_address: "http://127.0.0.1:8265".into(),
            python: "python3".into(),
            entry_point: "train.py".into(),
            python_path: "/root/Megatron-LM/".into(),
            gym_url: None,
            wandb_api_key: None,
            wandb_project: "claude-code-agent".into(),
            run_id: default_run_id(),
            cleanup_patterns: vec!["sglang".into(), "ray".into(), "python".into()],
            cleanup_grace_secs: 3,
            model: ModelArgs::default(),
            checkpoint: CheckpointArgs::default(),
            rollout: RolloutArgs::default(),
            optimizer: OptimizerArgs::default(),
            grpo: GrpoArgs::default(),
            perf: PerfArgs::default(),
            sglang: SglangArgs::default(),
            agent: AgentArgs::default(),
        }
    }
}

impl Default for ModelArgs {
    fn default() -> Self {
        // Qwen3-4B
        #[rustfmt::skip]
        let args = [
            "--swiglu",
            "--num-layers", "36",
            "--hidden-size", "2560",
            "--ffn-hidden-size", "9728",
            "--num-attention-heads", "32",
            "--group-query-attention",
            "--num-query-groups", "8",
            "--use-rotary-position-embeddings",
            "--disable-bias-linear",
            "--normalization", "RMSNorm",
            "--norm-epsilon", "1e-6",
            "--rotary-base", "1000000",
            "--vocab-size", "151936",
            "--kv-channels", "128",
            "--qk-layernorm",
        ];
        Self {
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for CheckpointArgs {
    fn default() -> Self {
        Self {
            hf_checkpoint: "/root/Qwen3-4B".into(),
            ref_load: "/root/Qwen3-4B_torch_dist".into(),
            load: None,
            save: None,
            save_interval: 20,
        }
    }
}

impl Default for RolloutArgs {
    fn default() -> Self {
        Self {
            prompt_data: "/root/data/claude_code_tasks.jsonl".into(),
            num_rollout: 100,
            rollout_batch_size: 16,
            n_samples_per_prompt: 4,
            max_response_len: 8192,
            temperature: 1.0,
            global_batch_size: 64,
        }
    }
}

impl Default for OptimizerArgs {
    fn default() -> Self {
        Self {
            lr: 1e-6,
            lr_decay_style: "constant".into(),
            weight_decay: 0.1,
            adam_beta1: 0.9,
            adam_beta2: 0.98,
        }
    }
}

impl Default for GrpoArgs {
    fn default() -> Self {
        Self {
            use_kl_loss: true,
            kl_loss_coef: 0.0,
            kl_loss_type: "low_var_kl".into(),
            entropy_coef: 0.0,
            eps_clip: 0.2,
            eps_clip_high: 0.28,
        }
    }
}

impl Default for PerfArgs {
    fn default() -> Self {
        Self {
            tensor_parallel: 2,
            pipeline_parallel: 1,
            context_parallel: 1,
            sequence_parallel: true,
            recompute: true,
            max_tokens_per_gpu: 9216,
        }
    }
}

impl Default for SglangArgs {
    fn default() -> Self {
        Self {
            gpus_per_engine: 2,
            mem_fraction_static: 0.7,
        }
    }
}

impl Default for AgentArgs {
    fn default() -> Self {
        Self {
            hook_module: "generate_with_claude_code".into(),
            max_turns: 16,
            max_tool_calls: 20,
        }
    }
}
