//! Training entry point flags, grouped by concern.

use crate::launch::config::LaunchConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct FlagGroup {
    pub name: &'static str,
    pub args: Vec<String>,
}

/// Flag groups in submission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlagGroups(pub Vec<FlagGroup>);

/// Small builder so group definitions read like the command line.
#[derive(Default)]
struct Args(Vec<String>);

impl Args {
    fn flag(mut self, name: &str) -> Self {
        self.0.push(name.to_string());
        self
    }

    fn opt(mut self, name: &str, value: impl ToString) -> Self {
        self.0.push(name.to_string());
        self.0.push(value.to_string());
        self
    }

    fn opt_if(self, name: &str, value: Option<&String>) -> Self {
        match value {
            Some(v) => self.opt(name, v),
            None => self,
        }
    }

    fn flag_if(self, name: &str, on: bool) -> Self {
        if on {
            self.flag(name)
        } else {
            self
        }
    }

    fn group(self, name: &'static str) -> FlagGroup {
        FlagGroup {
            name,
            args: self.0,
        }
    }
}

impl FlagGroups {
    /// `model`, `checkpoint`, `rollout`, `optimizer`, `grpo`, `perf`,
    /// `sglang`, `misc`, then `wandb` when a key is set and `agent` when a gym
    /// URL is set.
    pub fn standard(config: &LaunchConfig) -> Self {
        let mut groups = vec![
            FlagGroup {
                name: "model",
                args: config.model.args.clone(),
            },
            checkpoint(config),
            rollout(config),
            optimizer(config),
            grpo(config),
            perf(config),
            sglang(config),
            misc(config),
        ];
        if let Some(key) = &config.wandb_api_key {
            groups.push(
                Args::default()
                    .flag("--use-wandb")
                    .opt("--wandb-project", &config.wandb_project)
                    .opt("--wandb-group", &config.run_id)
                    .opt("--wandb-key", key)
                    .group("wandb"),
            );
        }
        if config.gym_url.is_some() {
            groups.push(agent(config));
        }
        Self(groups)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|g| g.name).collect()
    }

    /// All groups' args concatenated in order.
    pub fn flatten(&self) -> Vec<String> {
        self.0.iter().flat_map(|g| g.args.iter().cloned()).collect()
    }
}

fn checkpoint(config: &LaunchConfig) -> FlagGroup {
    let c = &config.checkpoint;
    Args::default()
        .opt("--hf-checkpoint", &c.hf_checkpoint)
        .opt("--ref-load", &c.ref_load)
        .opt_if("--load", c.load.as_ref())
        .opt_if("--save", c.save.as_ref())
        .opt("--save-interval", c.save_interval)
        .group("checkpoint")
}

fn rollout(config: &LaunchConfig) -> FlagGroup {
    let r = &config.rollout;
    Args::default()
        .opt("--prompt-data", &r.prompt_data)
        .opt("--input-key", "prompt")
        .opt("--label-key", "label")
        .opt("--metadata-key", "metadata")
        .flag("--rollout-shuffle")
        .opt("--num-rollout", r.num_rollout)
        .opt("--rollout-batch-size", r.rollout_batch_size)
        .opt("--n-samples-per-prompt", r.n_samples_per_prompt)
        .opt("--rollout-max-response-len", r.max_response_len)
        .opt("--rollout-temperature", r.temperature)
        .opt("--global-batch-size", r.global_batch_size)
        .group("rollout")
}

fn optimizer(config: &LaunchConfig) -> FlagGroup {
    let o = &config.optimizer;
    Args::default()
        .opt("--optimizer", "adam")
        .opt("--lr", o.lr)
        .opt("--lr-decay-style", &o.lr_decay_style)
        .opt("--weight-decay", o.weight_decay)
        .opt("--adam-beta1", o.adam_beta1)
        .opt("--adam-beta2", o.adam_beta2)
        .group("optimizer")
}

fn grpo(config: &LaunchConfig) -> FlagGroup {
    let g = &config.grpo;
    Args::default()
        .opt("--advantage-estimator", "grpo")
        .flag_if("--use-kl-loss", g.use_kl_loss)
        .opt("--kl-loss-coef", g.kl_loss_coef)
        .opt("--kl-loss-type", &g.kl_loss_type)
        .opt("--entropy-coef", g.entropy_coef)
        .opt("--eps-clip", g.eps_clip)
        .opt("--eps-clip-high", g.eps_clip_high)
        .group("grpo")
}

fn perf(config: &LaunchConfig) -> FlagGroup {
    let p = &config.perf;
    let args = Args::default()
        .opt("--tensor-model-parallel-size", p.tensor_parallel)
        .flag_if("--sequence-parallel", p.sequence_parallel)
        .opt("--pipeline-model-parallel-size", p.pipeline_parallel)
        .opt("--context-parallel-size", p.context_parallel);
    let args = if p.recompute {
        args.opt("--recompute-granularity", "full")
            .opt("--recompute-method", "uniform")
            .opt("--recompute-num-layers", 1)
    } else {
        args
    };
    args.flag("--use-dynamic-batch-size")
        .opt("--max-tokens-per-gpu", p.max_tokens_per_gpu)
        .group("perf")
}

fn sglang(config: &LaunchConfig) -> FlagGroup {
    let s = &config.sglang;
    Args::default()
        .opt("--rollout-num-gpus-per-engine", s.gpus_per_engine)
        .opt("--sglang-mem-fraction-static", s.mem_fraction_static)
        .group("sglang")
}

fn misc(config: &LaunchConfig) -> FlagGroup {
    Args::default()
        .opt("--attention-dropout", "0.0")
        .opt("--hidden-dropout", "0.0")
        .flag("--accumulate-allreduce-grads-in-fp32")
        .flag("--attention-softmax-in-fp32")
        .opt("--attention-backend", "flash")
        .opt("--actor-num-nodes", 1)
        .opt("--actor-num-gpus-per-node", config.num_gpus)
        .flag("--colocate")
        .group("misc")
}

fn agent(config: &LaunchConfig) -> FlagGroup {
    let a = &config.agent;
    let hook = |name: &str| format!("{}.{name}", a.hook_module);
    Args::default()
        .opt("--custom-generate-function-path", hook("generate"))
        .opt("--custom-rm-path", hook("reward_func"))
        .opt("--dynamic-sampling-filter-path", hook("dynamic_filter"))
        .opt("--rollout-function-path", hook("generate_rollout"))
        .opt("--rollout-max-turns", a.max_turns)
        .opt("--rollout-max-tool-calls", a.max_tool_calls)
        .group("agent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order_without_optional_groups() {
        let groups = FlagGroups::standard(&LaunchConfig::default());
        assert_eq!(
            groups.names(),
            ["model", "checkpoint", "rollout", "optimizer", "grpo", "perf", "sglang", "misc"]
        );
    }

    #[test]
    fn test_optional_groups_come_last() {
        let config = LaunchConfig {
            wandb_api_key: Some("k".into()),
            gym_url: Some("http://gym:12000".into()),
            run_id: "r1".into(),
            ..LaunchConfig::default()
        };
        let groups = FlagGroups::standard(&config);
        let names = groups.names();
        assert_eq!(&names[names.len() - 2..], ["wandb", "agent"]);

        let agent = &groups.0[names.len() - 1].args;
        assert!(agent
            .windows(2)
            .any(|w| w == ["--custom-rm-path", "generate_with_claude_code.reward_func"]));
        let wandb = &groups.0[names.len() - 2].args;
        assert!(wandb.windows(2).any(|w| w == ["--wandb-group", "r1"]));
    }

    #[test]
    fn test_flatten_concatenates_in_order() {
        let groups = FlagGroups::standard(&LaunchConfig::default());
        let flat = groups.flatten();
        let total: usize = groups.0.iter().map(|g| g.args.len()).sum();
        assert_eq!(flat.len(), total);
        assert_eq!(flat[0], "--swiglu");
        assert_eq!(flat.last().map(String::as_str), Some("--colocate"));

        let ckpt = flat.iter().position(|a| a == "--hf-checkpoint").unwrap();
        let lr = flat.iter().position(|a| a == "--lr").unwrap();
        let tp = flat.iter().position(|a| a == "--tensor-model-parallel-size").unwrap();
        assert!(ckpt < lr && lr < tp);
    }

    #[test]
    fn test_optional_values() {
        let mut config = LaunchConfig::default();
        let flat = FlagGroups::standard(&config).flatten();
        assert!(!flat.iter().any(|a| a == "--save"));

        config.checkpoint.save = Some("/ckpt".into());
        config.perf.recompute = false;
        let flat = FlagGroups::standard(&config).flatten();
        assert!(flat.windows(2).any(|w| w == ["--save", "/ckpt"]));
        assert!(!flat.iter().any(|a| a == "--recompute-granularity"));
        assert!(flat.windows(2).any(|w| w == ["--actor-num-gpus-per-node", "8"]));
    }
}
