//! Integration tests: document → graph → document, and the referential
//! integrity the graph keeps through removals.

use flow_core::model::{EdgeType, FlowEdge, FlowGraph, FlowNode, NodeKind, Position};
use flow_core::{EdgeId, Flow, FlowDocument, FlowError, NodeId};
use pretty_assertions::assert_eq;

fn guard_flow() -> FlowDocument {
    let n = |s: &str| NodeId::intern(s);
    let e = |s: &str| EdgeId::intern(s);
    FlowDocument {
        nodes: vec![
            FlowNode::new(n("di_guard"), NodeKind::Condition, Position::new(0.0, 0.0))
                .with_label("Closed guard"),
            FlowNode::new(n("di_hip"), NodeKind::Technique, Position::new(-160.0, 200.0))
                .with_label("Hip bump")
                .with_ref("tech-3"),
            FlowNode::new(n("di_kimura"), NodeKind::Technique, Position::new(160.0, 200.0))
                .with_label("Kimura"),
            FlowNode::new(n("di_note"), NodeKind::Note, Position::new(0.0, 400.0))
                .with_label("drill both sides"),
        ],
        edges: vec![
            FlowEdge::new(e("di_1"), n("di_guard"), n("di_hip")).with_label("opponent sits back"),
            FlowEdge::new(e("di_2"), n("di_guard"), n("di_kimura"))
                .with_label("opponent posts hand"),
            FlowEdge {
                edge_type: EdgeType::Counter,
                ..FlowEdge::new(e("di_3"), n("di_hip"), n("di_kimura"))
            },
            FlowEdge::new(e("di_4"), n("di_kimura"), n("di_kimura")),
        ],
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_no_dangling(graph: &FlowGraph) {
    for edge in graph.edges() {
        assert!(graph.contains_node(edge.source), "{} has no source", edge.id);
        assert!(graph.contains_node(edge.target), "{} has no target", edge.id);
    }
}

#[test]
fn document_survives_graph_round_trip_in_order() {
    init_logging();
    let doc = guard_flow();
    let graph = FlowGraph::from_document(&doc).unwrap();
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.to_document(), doc);
}

#[test]
fn json_and_msgpack_agree() {
    let doc = guard_flow();
    let from_json = FlowDocument::from_json(&doc.to_json().unwrap()).unwrap();
    let from_msgpack = FlowDocument::from_msgpack(&doc.to_msgpack().unwrap()).unwrap();
    assert_eq!(from_json, doc);
    assert_eq!(from_msgpack, doc);
}

#[test]
fn json_uses_camel_case_and_omits_missing_labels() {
    let value = guard_flow().to_value().unwrap();
    assert_eq!(value["nodes"][1]["refId"], "tech-3");
    assert_eq!(value["edges"][2]["edgeType"], "counter");
    assert!(value["edges"][2].get("label").is_none());
}

#[test]
fn removing_nodes_never_leaves_dangling_edges() {
    init_logging();
    let mut graph = FlowGraph::from_document(&guard_flow()).unwrap();

    let removed = graph.remove_node(NodeId::intern("di_kimura")).unwrap();
    // Incoming from guard and hip, plus the self-loop, each exactly once
    let ids: Vec<&str> = removed.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["di_2", "di_3", "di_4"]);
    assert_no_dangling(&graph);
    assert_eq!(graph.edge_count(), 1);

    graph.remove_node(NodeId::intern("di_guard")).unwrap();
    assert_no_dangling(&graph);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn inconsistent_documents_are_rejected() {
    let mut dangling = guard_flow();
    dangling.nodes.retain(|n| n.id.as_str() != "di_hip");
    assert!(matches!(
        FlowGraph::from_document(&dangling),
        Err(FlowError::InvalidEdge { .. })
    ));

    let mut duplicate = guard_flow();
    let copy = duplicate.nodes[0].clone();
    duplicate.nodes.push(copy);
    assert!(matches!(
        FlowGraph::from_document(&duplicate),
        Err(FlowError::InvalidDocument(_))
    ));
}

#[test]
fn fresh_ids_keep_shape_and_shift_positions() {
    let doc = guard_flow();
    let copy = doc.with_fresh_ids(500.0, -20.0);
    assert_eq!(copy.nodes.len(), doc.nodes.len());
    assert_eq!(copy.edges.len(), doc.edges.len());
    assert!(copy.nodes.iter().all(|n| !doc.nodes.iter().any(|o| o.id == n.id)));
    assert_eq!(copy.nodes[1].position, Position::new(340.0, 180.0));
    assert_eq!(copy.nodes[1].label, "Hip bump");

    // Both documents can live in one graph
    let mut merged = doc.clone();
    merged.nodes.extend(copy.nodes);
    merged.edges.extend(copy.edges);
    let graph = FlowGraph::from_document(&merged).unwrap();
    assert_eq!(graph.node_count(), 8);
    assert_no_dangling(&graph);
}

#[test]
fn stored_flow_json_loads() {
    let json = r#"{
        "header": {
            "id": "3f0c", "owner_id": "u1", "name": "Back takes",
            "created_at": "2026-01-05T10:00:00Z", "updated_at": "2026-01-05T10:00:00Z"
        },
        "document": {
            "nodes": [
                {"id": "bt_a", "kind": "position", "label": "Turtle", "position": {"x": 0, "y": 0}},
                {"id": "bt_b", "kind": "technique", "label": "Seatbelt", "position": {"x": 0, "y": 150}}
            ],
            "edges": [{"id": "bt_e", "source": "bt_a", "target": "bt_b"}]
        }
    }"#;
    let flow: Flow = serde_json::from_str(json).unwrap();
    assert_eq!(flow.document.nodes[0].kind, NodeKind::Condition);
    assert_eq!(flow.document.edges[0].edge_type, EdgeType::Default);
    assert!(FlowGraph::from_document(&flow.document).is_ok());
}
