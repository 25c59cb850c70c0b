//! Crawl to screen: crawler snapshots flow through the store into the
//! simulation, and pointer positions come back through the viewport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use friend_graph::{
    CanonicalId, Crawler, DependencyGraph, DependencyRecord, GraphStore, IdentityNode, NodeStatus,
    Profile, RateLimiter, StaticResolver, Verbatim,
};
use friend_layout::{
    dependency_input, graph_input, ForceSimulation, Interaction, LayoutConfig, LayoutEngine,
    LayoutFrame, LayoutInput, LayoutLink, LayoutNode, NodeStyle, Pos2, Scene, Vec2, ViewportConfig,
    ViewportTransform,
};
use pretty_assertions::assert_eq;

/// No two node circles overlap.
fn assert_no_overlap(frame: &LayoutFrame) {
    for (i, a) in frame.nodes.iter().enumerate() {
        for b in &frame.nodes[i + 1..] {
            let gap = (a.position - b.position).length();
            assert!(gap >= a.radius + b.radius, "{} overlaps {}", a.id, b.id);
        }
    }
}

fn settle(sim: &mut ForceSimulation) {
    let mut ticks = 0;
    while sim.tick() {
        ticks += 1;
        assert!(ticks < 5_000, "layout never settled");
    }
}

#[test]
fn ring_settles_with_bounded_links_and_no_overlap() {
    let ids = ["a", "b", "c", "d", "e", "f"];
    let input = LayoutInput {
        nodes: ids.iter().map(|id| LayoutNode::new(*id, *id, 5.0)).collect(),
        links: ids
            .iter()
            .zip(ids.iter().cycle().skip(1))
            .map(|(s, t)| LayoutLink::new(*s, *t))
            .collect(),
    };
    let config = LayoutConfig::default().with_seed(7);
    let mut sim = ForceSimulation::with_input(config.clone(), input);
    settle(&mut sim);

    let frame = sim.frame();
    for (source, target) in frame.link_endpoints() {
        let length = (target.position - source.position).length();
        assert!(
            (40.0..=160.0).contains(&length),
            "{} - {} is {length}",
            source.id,
            target.id
        );
    }
    assert_no_overlap(&frame);
}

#[tokio::test(start_paused = true)]
async fn engine_started_empty_settles_a_path() {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    let engine = LayoutEngine::start(
        LayoutInput::default(),
        LayoutConfig::default().with_seed(3),
        move |frame| sink.lock().unwrap().push(frame),
    );

    let config = LayoutConfig::default();
    let summary = engine.update(LayoutInput {
        nodes: [("a", 1), ("b", 2), ("c", 1)]
            .into_iter()
            .map(|(id, degree)| LayoutNode::new(id, id, config.node_radius(degree)))
            .collect(),
        links: vec![LayoutLink::new("a", "b"), LayoutLink::new("b", "c")],
    });
    assert_eq!(summary.added, 3);
    assert_eq!(summary.links, 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(engine.is_settled());

    let frame = engine.frame();
    for (source, target) in frame.link_endpoints() {
        let length = (target.position - source.position).length();
        assert!((40.0..=150.0).contains(&length), "{} - {} is {length}", source.id, target.id);
    }
    assert!(frame.node("b").unwrap().radius > frame.node("a").unwrap().radius);
    assert_no_overlap(&frame);
    let a = frame.node("a").unwrap().position;
    let c = frame.node("c").unwrap().position;
    assert!((a - c).length() > 10.0);

    let emitted = frames.lock().unwrap();
    assert!(emitted.iter().any(|f| f.nodes.len() == 3));
    drop(emitted);
    engine.shutdown().await;
}

#[test]
fn dependents_sit_below_dependencies() {
    let mut dag = DependencyGraph::from_records(&[
        DependencyRecord::new("app").depends_on(["web", "core"]),
        DependencyRecord::new("web").depends_on(["core"]),
    ]);
    assert_eq!(dag.prune().unwrap(), 1);

    let config = LayoutConfig::dependency_dag().with_seed(11);
    let input = dependency_input(&dag, &config);
    assert_eq!(input.links.len(), 2);

    let mut sim = ForceSimulation::with_input(config, input);
    settle(&mut sim);

    let y = |id: &str| sim.get_node(id).unwrap().position.y;
    assert!(y("app") > y("web"), "app {} web {}", y("app"), y("web"));
    assert!(y("web") > y("core"), "web {} core {}", y("web"), y("core"));
}

#[tokio::test(start_paused = true)]
async fn crawl_feeds_layout_and_picking_survives_zoom() {
    let resolver = Arc::new(
        StaticResolver::new()
            .with_profile("me", Profile::with_edges(["bob", "carol"]).named("Me"))
            .with_friends("bob", &["carol"])
            .with_friends("carol", &["me"]),
    );
    let crawler = Crawler::new(
        resolver,
        Arc::new(RateLimiter::unlimited()),
        Arc::new(Verbatim),
    );

    let store = Arc::new(GraphStore::new());
    let mut updates = store.subscribe();
    let publisher = Arc::clone(&store);
    let report = crawler
        .start(vec![IdentityNode::pending(CanonicalId::new("me"))], move |snapshot| {
            publisher.publish(&snapshot);
        })
        .finished()
        .await
        .unwrap();
    assert_eq!(report.resolved, 3);
    assert!(updates.has_changed().unwrap());

    let graph = updates.borrow_and_update().clone();
    assert_eq!(graph.len(), 3);
    assert!(graph.nodes().all(|n| n.status() == NodeStatus::Success));

    let config = LayoutConfig::default().with_seed(5);
    let frames = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&frames);
    let engine = LayoutEngine::start(graph_input(&graph, &config), config, move |_| {
        *counter.lock().unwrap() += 1;
    });
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(engine.is_settled());
    assert!(*frames.lock().unwrap() > 0);

    let frame = engine.frame();
    let mut viewport = ViewportTransform::centered(ViewportConfig::default(), 800.0, 600.0);
    viewport.drag(Vec2::new(400.0, 300.0));
    viewport.zoom_at(Pos2::new(400.0, 300.0), 1.5);

    let scene = Scene::project(
        &frame,
        &viewport,
        &*graph,
        Interaction {
            hovered: None,
            selected: Some("me"),
        },
    );
    assert_eq!(scene.node("me").unwrap().style, NodeStyle::Focus);
    assert_eq!(scene.node("me").unwrap().label, "Me");
    assert_eq!(scene.node("bob").unwrap().style, NodeStyle::Accent);
    assert_eq!(scene.links.len(), 4);

    // Clicking where bob is drawn picks bob.
    let on_screen = scene.node("bob").unwrap().position;
    let picked = engine.hit_test(viewport.invert(on_screen));
    assert_eq!(picked.as_deref(), Some("bob"));

    engine.shutdown().await;
}
