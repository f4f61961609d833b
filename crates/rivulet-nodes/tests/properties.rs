//! Property tests for the standard nodes.

mod common;

use proptest::prelude::*;
use rivulet_nodes::{Saw, Sine, Square, Width, add, multiply};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn oscillators_stay_in_range(frequency in -20_000.0f32..20_000.0, width in 0.0f32..1.0) {
        let mut graph = common::graph();
        let sine = graph.add(Sine::new());
        let saw = graph.add(Saw::new());
        let square = graph.add(Square::new());
        for node in [sine, saw, square] {
            graph.set_value(node, "frequency", frequency).unwrap();
        }
        graph.set_value(square, "width", width).unwrap();

        for node in [sine, saw, square] {
            let out = graph.run(node, 256);
            prop_assert!(out[0].iter().all(|x| (-1.0..=1.0).contains(x)));
        }
    }

    #[test]
    fn arithmetic_matches_f32(a in -1000.0f32..1000.0, b in -1000.0f32..1000.0) {
        let mut graph = common::graph();
        let sum = add(&mut graph, a, b).unwrap();
        let product = multiply(&mut graph, a, b).unwrap();
        prop_assert_eq!(graph.run(sum, 4)[0].clone(), vec![a + b; 4]);
        prop_assert_eq!(graph.run(product, 4)[0].clone(), vec![a * b; 4]);
    }

    #[test]
    fn width_never_louder_than_input(input in -1.0f32..1.0, spread in -1.0f32..2.0) {
        let mut graph = common::graph();
        let width = graph.add(Width);
        graph.set_value(width, "input", input).unwrap();
        graph.set_value(width, "width", spread).unwrap();

        let out = graph.run(width, 1);
        prop_assert_eq!(out[0][0], input);
        prop_assert!(out[1][0].abs() <= input.abs());
    }
}
