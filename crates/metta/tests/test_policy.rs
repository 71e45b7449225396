use metta::prelude::*;
use metta::MettaError;
use metta_envs::{GridForage, GridForageConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn build(config: &GridForageConfig, policy_config: PolicyConfig) -> metta::Result<PolicyModule> {
    let env = GridForage::new(config.clone());
    PolicyModule::new(
        &env.observation_space(),
        &env.action_space(),
        &GridForage::grid_features(),
        &GridForage::global_features(),
        &WeightTransforms::new(),
        policy_config,
        Device::Cpu,
    )
}

fn small() -> PolicyConfig {
    PolicyConfig::default()
        .with_encoder(EncoderConfig {
            conv_channels: vec![4],
            kernel_size: 3,
            stride: 1,
            output_size: 16,
        })
        .with_rnn_size(8)
        .with_actor_hidden(vec![8])
        .with_critic_hidden(vec![8])
}

fn observation_batch(config: &GridForageConfig, n: usize) -> candle_core::Tensor {
    let mut backend = Serial::new(|| GridForage::new(config.clone()), n);
    let (obs, _) = backend.reset(Some(0)).unwrap();
    obs.to_tensor(&Device::Cpu).unwrap()
}

#[test]
fn test_heads_follow_action_space() {
    let discrete = build(&GridForageConfig::default(), small()).unwrap();
    assert_eq!(
        *discrete.action_space(),
        ActionSpaceDescriptor::Discrete { n: 5 }
    );
    assert_eq!(discrete.action_heads().output_sizes(), vec![5]);

    let config = GridForageConfig {
        multi_discrete: true,
        ..Default::default()
    };
    let pair = build(&config, small()).unwrap();
    assert_eq!(pair.action_heads().num_heads(), 2);
    assert_eq!(pair.action_heads().output_sizes(), vec![3, 4]);
    assert!(pair.num_parameters() > discrete.num_parameters());
}

#[test]
fn test_encode_and_decode_shapes() {
    let config = GridForageConfig::default();
    let policy = build(&config, small()).unwrap();
    let obs = observation_batch(&config, 3);

    let encoded = policy.encode_observations(&obs).unwrap();
    assert_eq!(encoded.dims(), &[3, 16]);

    let core_output = candle_core::Tensor::zeros((3, 8), candle_core::DType::F32, &Device::Cpu).unwrap();
    let (state, values) = policy.decode_state(&core_output).unwrap();
    assert_eq!(state.dims(), &[3, policy.decoder_out_size()]);
    assert_eq!(values.dims(), &[3]);
}

#[test]
fn test_encoder_is_pure() {
    let config = GridForageConfig::default();
    let policy = build(&config, small()).unwrap();
    let obs = observation_batch(&config, 2);
    let a = policy.encode_observations(&obs).unwrap().to_vec2::<f32>().unwrap();
    let b = policy.encode_observations(&obs).unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_decoder_layers_from_config() {
    let config = GridForageConfig::default();
    let json = r#"{
        "encoder": { "conv_channels": [4], "output_size": 16 },
        "core": { "rnn_size": 8 },
        "decoder": { "hidden_sizes": [12, 6], "activation": "tanh" },
        "actor": { "hidden_sizes": [], "activation": "elu" },
        "critic": { "hidden_sizes": [4] }
    }"#;
    let policy = build(&config, PolicyConfig::from_json(json).unwrap()).unwrap();
    assert_eq!(policy.decoder_out_size(), 6);

    let inference = policy
        .infer(
            &observation_batch(&config, 2),
            None,
            &mut ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();
    assert_eq!(inference.values.dims(), &[2]);
    assert_eq!(inference.log_probs.dims(), &[2]);
    assert_eq!(inference.entropy.dims(), &[2]);
}

#[test]
fn test_unknown_activation_is_rejected() {
    let json = r#"{ "actor": { "activation": "swishy" } }"#;
    assert!(matches!(
        PolicyConfig::from_json(json),
        Err(MettaError::Config(_))
    ));
}

#[test]
fn test_save_and_load_round_trip() {
    let config = GridForageConfig::default();
    let obs = observation_batch(&config, 2);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.safetensors");

    let trained = build(&config, small().with_seed(1)).unwrap();
    trained.save(&path).unwrap();

    let mut fresh = build(&config, small().with_seed(2)).unwrap();
    let run = |policy: &PolicyModule| {
        policy
            .infer(&obs, None, &mut ChaCha8Rng::seed_from_u64(5))
            .unwrap()
            .values
            .to_vec1::<f32>()
            .unwrap()
    };
    fresh.load(&path).unwrap();
    assert_eq!(run(&trained), run(&fresh));
}

#[test]
fn test_hook_replaces_critic_weights() {
    let config = GridForageConfig::default();
    let env = GridForage::new(config.clone());
    let transforms = WeightTransforms::new().with("critic", |w: &candle_core::Tensor| w.ones_like());
    let policy = PolicyModule::new(
        &env.observation_space(),
        &env.action_space(),
        &GridForage::grid_features(),
        &GridForage::global_features(),
        &transforms,
        small(),
        Device::Cpu,
    )
    .unwrap();

    for name in ["critic.0.weight", "critic.1.weight"] {
        let w = policy.params().get(name).unwrap();
        let min = w.flatten_all().unwrap().min(0).unwrap().to_scalar::<f32>().unwrap();
        assert_eq!(min, 1.0, "{name}");
    }
}
