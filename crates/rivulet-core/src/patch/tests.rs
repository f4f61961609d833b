use super::*;
use crate::test_support::{self, OneShot, Pass, Source};

fn level_spec() -> PatchSpec {
    PatchSpec::new("level", |p| {
        let pass = p.add(Pass::new(1));
        let level = p.add_input("level", 0.5)?;
        p.connect(level, pass, "in")?;
        p.set_output(pass);
        Ok(())
    })
}

fn sink_sample(graph: &Graph) -> f32 {
    graph.node_output(graph.output()).unwrap().channel(0)[0]
}

#[test]
fn patch_plays_its_default() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    assert_eq!(graph.patch_name(patch).unwrap(), "level");
    assert_eq!(graph.patch_inputs(patch).unwrap(), ["level"]);
    // pass plus the parameter's default constant
    assert_eq!(graph.patch_nodes(patch).unwrap().len(), 2);

    graph.play_patch(patch).unwrap();
    assert_eq!(graph.patch_count(), 1);
    graph.render(8).unwrap();
    assert_eq!(sink_sample(&graph), 0.5);
}

#[test]
fn patch_values_and_inputs_forward_to_targets() {
    let mut graph = test_support::graph();
    let patch = level_spec().instantiate(&mut graph).unwrap();
    graph.play_patch(patch).unwrap();

    graph.set_patch_value(patch, "level", 0.8).unwrap();
    graph.render(8).unwrap();
    assert_eq!(sink_sample(&graph), 0.8);

    let src = graph.add(Source::new(0.25, 1));
    graph.set_patch_input(patch, "level", src).unwrap();
    graph.render(8).unwrap();
    assert_eq!(sink_sample(&graph), 0.25);

    graph.set_patch_value(patch, "level", 0.3).unwrap();
    graph.render(8).unwrap();
    assert_eq!(sink_sample(&graph), 0.3);
}

#[test]
fn unknown_patch_parameter_names_the_patch() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    assert!(matches!(
        graph.set_patch_value(patch, "cutoff", 1.0),
        Err(Error::UnknownParameter { ref node, ref name }) if node == "level" && name == "cutoff"
    ));
}

#[test]
fn instances_own_disjoint_nodes() {
    let mut graph = test_support::graph();
    let spec = level_spec();
    let a = graph.create_patch(&spec).unwrap();
    let b = graph.create_patch(&spec).unwrap();
    let a_nodes = graph.patch_nodes(a).unwrap().to_vec();
    let b_nodes = graph.patch_nodes(b).unwrap();
    assert!(a_nodes.iter().all(|n| !b_nodes.contains(n)));

    graph.set_patch_value(a, "level", 0.1).unwrap();
    graph.play_patch(b).unwrap();
    graph.render(4).unwrap();
    assert_eq!(sink_sample(&graph), 0.5);
}

#[test]
fn missing_output_frees_created_nodes() {
    let mut graph = test_support::graph();
    let before = graph.num_nodes();
    let spec = PatchSpec::new("headless", |p| {
        p.add(Pass::new(1));
        Ok(())
    });
    assert!(matches!(
        graph.create_patch(&spec),
        Err(Error::InvalidConfiguration(_))
    ));
    assert_eq!(graph.num_nodes(), before);
}

#[test]
fn recipe_errors_propagate_and_clean_up() {
    let mut graph = test_support::graph();
    let before = graph.num_nodes();
    let spec = PatchSpec::new("broken", |p| {
        let pass = p.add(Pass::new(1));
        p.set_value(pass, "gain", 1.0)?;
        p.set_output(pass);
        Ok(())
    });
    assert!(matches!(
        graph.create_patch(&spec),
        Err(Error::UnknownParameter { .. })
    ));
    assert_eq!(graph.num_nodes(), before);
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let mut graph = test_support::graph();
    let spec = PatchSpec::new("twice", |p| {
        let pass = p.add(Pass::new(1));
        p.add_input("x", 0.0)?;
        p.add_input("x", 1.0)?;
        p.set_output(pass);
        Ok(())
    });
    assert!(graph.create_patch(&spec).is_err());
}

#[test]
fn stop_patch_is_deferred_and_keeps_nodes() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    let output = graph.patch_output(patch).unwrap();
    graph.play_patch(patch).unwrap();
    graph.render(4).unwrap();

    graph.stop_patch(patch).unwrap();
    assert!(graph.is_patch_playing(patch));
    graph.render(4).unwrap();
    assert!(!graph.is_patch_playing(patch));
    assert!(!graph.is_playing(output));
    assert!(graph.contains(output));
    assert_eq!(sink_sample(&graph), 0.0);

    graph.play_patch(patch).unwrap();
    graph.render(4).unwrap();
    assert_eq!(sink_sample(&graph), 0.5);
}

#[test]
fn stop_patch_detaches_the_output_from_every_consumer() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    let output = graph.patch_output(patch).unwrap();
    let fx = graph.add(Pass::new(1));
    graph.set_param(fx, "in", output).unwrap();
    graph.play(fx).unwrap();
    graph.play_patch(patch).unwrap();
    graph.render(4).unwrap();
    assert_eq!(sink_sample(&graph), 1.0);

    graph.stop_patch(patch).unwrap();
    assert_eq!(graph.input_of(fx, "in").unwrap(), Some(output));
    graph.render(4).unwrap();
    assert_eq!(graph.input_of(fx, "in").unwrap(), None);
    assert!(graph.is_playing(fx));
    assert_eq!(sink_sample(&graph), 0.0);
}

#[test]
fn patch_churn_keeps_the_tables_bounded() {
    let mut graph = test_support::graph();
    let spec = level_spec();
    let mut stale = Vec::new();
    for i in 0..1000 {
        let patch = graph.create_patch(&spec).unwrap();
        graph.play_patch(patch).unwrap();
        if i % 2 == 0 {
            graph.free_patch(patch).unwrap();
        } else {
            graph.stop_patch(patch).unwrap();
            graph.render(8).unwrap();
            graph.free_patch(patch).unwrap();
        }
        if i < 3 {
            stale.push(patch);
        }
    }
    assert_eq!(graph.num_nodes(), 1);
    assert!(graph.nodes.slots() <= 3, "{} node slots", graph.nodes.slots());
    assert_eq!(graph.patches.slots(), 1);

    // old handles stay dead after their slots are reused
    let live = graph.create_patch(&spec).unwrap();
    for patch in stale {
        assert!(matches!(graph.patch_output(patch), Err(Error::PatchNotFound(_))));
        assert!(graph.play_patch(patch).is_err());
    }
    assert!(graph.patch_output(live).is_ok());
}

#[test]
fn auto_free_patch_is_freed_when_stopped() {
    let mut graph = test_support::graph();
    let spec = PatchSpec::new("transient", |p| {
        let pass = p.add(Pass::new(1));
        p.set_output(pass);
        p.set_auto_free(true);
        Ok(())
    });
    let patch = graph.create_patch(&spec).unwrap();
    let output = graph.patch_output(patch).unwrap();
    graph.play_patch(patch).unwrap();
    graph.stop_patch(patch).unwrap();
    graph.render(4).unwrap();

    assert!(!graph.contains(output));
    assert!(matches!(graph.patch_name(patch), Err(Error::PatchNotFound(_))));
    assert_eq!(graph.patch_count(), 0);
}

#[test]
fn auto_free_patch_is_freed_when_a_node_finishes() {
    let mut graph = test_support::graph();
    let spec = PatchSpec::new("blip", |p| {
        let shot = p.add(OneShot { remaining: 1 });
        p.set_output(shot);
        p.set_auto_free(true);
        Ok(())
    });
    let patch = graph.create_patch(&spec).unwrap();
    graph.play_patch(patch).unwrap();

    graph.render(4).unwrap();
    assert_eq!(sink_sample(&graph), 1.0);
    assert!(graph.is_patch_playing(patch));

    graph.render(4).unwrap();
    assert!(!graph.is_patch_playing(patch));
    assert!(graph.patch_output(patch).is_err());
    assert_eq!(sink_sample(&graph), 0.0);
}

#[test]
fn free_patch_is_immediate() {
    let mut graph = test_support::graph();
    let before = graph.num_nodes();
    let patch = graph.create_patch(&level_spec()).unwrap();
    graph.play_patch(patch).unwrap();
    graph.free_patch(patch).unwrap();
    assert_eq!(graph.num_nodes(), before);
    assert_eq!(graph.patch_count(), 0);
    assert!(matches!(graph.free_patch(patch), Err(Error::PatchNotFound(_))));
}

#[test]
fn controller_plays_patches() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    graph.controller().play_patch(patch).unwrap();
    assert_eq!(graph.patch_count(), 0);
    graph.render(4).unwrap();
    assert_eq!(graph.patch_count(), 1);
    assert_eq!(sink_sample(&graph), 0.5);
}

#[test]
fn nodes_added_outside_a_recipe_are_not_captured() {
    let mut graph = test_support::graph();
    let patch = graph.create_patch(&level_spec()).unwrap();
    graph.add(Pass::new(1));
    assert_eq!(graph.patch_nodes(patch).unwrap().len(), 2);
}
