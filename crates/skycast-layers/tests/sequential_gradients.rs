use skycast_layers::prelude::*;

fn network() -> Sequential {
    SequentialConfig::new(3)
        .add_dense(4, ActivationType::None, Regularizer::L2(0.01))
        .add_batch_norm(0.01, 1e-3)
        .add_dense(1, ActivationType::None, Regularizer::None)
        .build(42)
        .unwrap()
}

fn inputs() -> (Tensor, Tensor) {
    let x = Tensor::from_data(
        &[4, 3],
        vec![
            0.5, -1.0, 2.0, //
            1.5, 0.0, -0.5, //
            -2.0, 1.0, 1.0, //
            0.3, 0.7, -1.2,
        ],
    );
    let upstream = Tensor::from_data(&[4, 1], vec![1.0, -0.5, 0.25, 2.0]);
    (x, upstream)
}

fn objective(net: &Sequential, x: &Tensor, upstream: &Tensor) -> f32 {
    let mut net = net.clone();
    net.forward_train(x).unwrap().mul(upstream).sum() + net.regularization_loss()
}

#[test]
fn test_backward_matches_finite_differences() {
    let (x, upstream) = inputs();
    let mut net = network();
    net.forward_train(&x).unwrap();
    net.backward(&upstream).unwrap();
    let analytic = net.collect_gradients().unwrap();

    let h = 1e-2;
    let num_params = net.parameters().len();
    for p in 0..num_params {
        let numel = net.parameters()[p].numel();
        for i in 0..numel {
            let mut plus = network();
            plus.parameters_mut()[p].data_mut()[i] += h;
            let mut minus = network();
            minus.parameters_mut()[p].data_mut()[i] -= h;

            let numeric =
                (objective(&plus, &x, &upstream) - objective(&minus, &x, &upstream)) / (2.0 * h);
            let got = analytic[p].data()[i];
            assert!(
                (numeric - got).abs() < 2e-2 * (1.0 + numeric.abs()),
                "param {} index {}: numeric {} vs analytic {}",
                p,
                i,
                numeric,
                got
            );
        }
    }
}

#[test]
fn test_serialized_network_keeps_running_stats() {
    let (x, _) = inputs();
    let mut net = network();
    for _ in 0..5 {
        net.forward_train(&x).unwrap();
    }
    net.set_training(false);

    let bytes = bincode::serialize(&net).unwrap();
    let restored: Sequential = bincode::deserialize(&bytes).unwrap();

    assert!(!restored.is_training());
    assert_eq!(restored.config(), net.config());
    assert_eq!(restored.forward(&x).unwrap(), net.forward(&x).unwrap());
}
