//! Sync engine properties: save/reload round-trips, name refresh after
//! sequence edits, and failure modes of reference resolution.

use optikit_assembly::{
    AssemblyError, NodeTag, OpticalModel, Referent, TreeFile,
};
use optikit_core::{Gap, Interface, Medium, SequenceModel};

fn glass(thickness: f64) -> Gap {
    Gap::material(thickness, Medium::material("N-BK7", 1.5168))
}

fn singlet() -> SequenceModel {
    let mut seq = SequenceModel::new();
    seq.push_surface(Interface::dummy(1.0), Some(Gap::air(100.0)));
    seq.push_surface(Interface::transmit(0.02, 8.0), Some(glass(4.0)));
    seq.push_surface(Interface::transmit(-0.02, 8.0), Some(Gap::air(46.0)));
    seq.push_surface(Interface::dummy(10.0), None);
    seq
}

fn cemented_doublet() -> SequenceModel {
    let mut seq = SequenceModel::new();
    seq.push_surface(Interface::dummy(1.0), Some(Gap::air(100.0)));
    seq.push_surface(Interface::transmit(0.02, 10.0), Some(glass(5.0)));
    seq.push_surface(
        Interface::transmit(-0.01, 10.0),
        Some(Gap::material(3.0, Medium::material("SF5", 1.6727))),
    );
    seq.push_surface(Interface::transmit(-0.02, 10.0), Some(Gap::air(40.0)));
    seq.push_surface(Interface::dummy(12.0), None);
    seq
}

fn records(file: &TreeFile) -> Vec<(String, String, Option<u32>)> {
    file.nodes
        .iter()
        .map(|r| (r.name.clone(), r.tag.clone(), r.parent))
        .collect()
}

#[test]
fn test_round_trip_restores_identical_tree() {
    let mut model = OpticalModel::new(cemented_doublet());
    model.rebuild_assembly().unwrap();

    let before = model.export_tree("doublet");
    let render_before = model.tree.render();

    model.restore_tree(&before).unwrap();

    assert_eq!(model.tree.render(), render_before);
    let after = model.export_tree("doublet");
    assert_eq!(records(&after), records(&before));

    // every referent resolves back to the original object identity
    for (idx, ifc) in model.seq.ifcs().iter().enumerate() {
        let node = model
            .tree
            .find_node(Referent::Interface(ifc.id()))
            .unwrap_or_else(|| panic!("surface {idx} missing after restore"));
        assert!(model.tree.referent(node).is_some());
    }
    for gap in model.seq.gaps() {
        assert!(model.tree.find_node(Referent::Gap(gap.id())).is_some());
    }
    for part in model.catalog.parts() {
        assert!(
            model
                .tree
                .find_node(Referent::Element(part.id()))
                .is_some(),
            "part {} missing after restore",
            part.label()
        );
    }
}

#[test]
fn test_file_round_trip_through_disk() {
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();
    let render_before = model.tree.render();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("singlet.tree.json");
    model.export_tree("singlet").save_to_file(&path).unwrap();

    let loaded = TreeFile::load_from_file(&path).unwrap();
    model.restore_tree(&loaded).unwrap();
    assert_eq!(model.tree.render(), render_before);
}

#[test]
fn test_restore_skeleton_has_no_referents_until_synced() {
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();
    let file = model.export_tree("singlet");

    let skeleton = file.to_tree().unwrap();
    for id in skeleton.preorder() {
        assert!(skeleton.referent(id).is_none());
    }
}

#[test]
fn test_restore_with_unknown_label_fails() {
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();
    let mut file = model.export_tree("singlet");

    // damage one element label so the catalog cannot resolve it
    let record = file
        .nodes
        .iter_mut()
        .find(|r| r.name == "E1")
        .expect("lens record present");
    record.name = "E9".to_string();

    let err = model.restore_tree(&file).unwrap_err();
    match err {
        AssemblyError::UnknownLabel { label } => assert_eq!(label, "E9"),
        other => panic!("expected UnknownLabel, got {other}"),
    }
}

#[test]
fn test_update_refreshes_shifted_indices() {
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();

    let s1 = model.seq.ifcs()[1].id();
    let s2 = model.seq.ifcs()[2].id();

    // a field lens plane slides in front of the singlet
    model
        .seq
        .insert_surface(1, Interface::dummy(6.0), Gap::air(10.0))
        .unwrap();
    model.update_model().unwrap();

    let tree = &model.tree;
    let n1 = tree.find_node(Referent::Interface(s1)).unwrap();
    let n2 = tree.find_node(Referent::Interface(s2)).unwrap();
    assert_eq!(tree.name(n1).to_string(), "i2");
    assert_eq!(tree.name(n2).to_string(), "i3");

    // the lens's glass gap shifted with its leading surface
    let g = model.seq.gaps()[2].id();
    let gn = tree.find_node(Referent::Gap(g)).unwrap();
    assert_eq!(tree.name(gn).to_string(), "g2");

    // the object dummy still references surface 0
    let object = tree.nodes_matching(NodeTag::OBJECT)[0];
    let di = tree.children(object)[0];
    assert_eq!(tree.name(di).to_string(), "di0");
}

#[test]
fn test_update_is_idempotent() {
    let mut model = OpticalModel::new(cemented_doublet());
    model.rebuild_assembly().unwrap();

    model
        .seq
        .insert_surface(1, Interface::dummy(6.0), Gap::air(10.0))
        .unwrap();
    model.update_model().unwrap();
    let first = model.tree.render();
    model.update_model().unwrap();
    assert_eq!(model.tree.render(), first);
}

#[test]
fn test_update_after_removal_reports_dangling_referent() {
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();

    // drop the lens front surface out from under the tree
    model.seq.remove_surface(1).unwrap();
    let err = model.update_model().unwrap_err();
    assert!(matches!(err, AssemblyError::DanglingReferent { .. }));
}

#[test]
fn test_restore_after_edit_uses_current_indices() {
    // save, edit the sequence, reload: names resolve against the
    // *current* model, so index-bearing names must be refreshed before
    // saving if they are to survive an edit. Here we refresh first and
    // verify the restored tree resolves cleanly.
    let mut model = OpticalModel::new(singlet());
    model.rebuild_assembly().unwrap();
    model
        .seq
        .insert_surface(1, Interface::dummy(6.0), Gap::air(10.0))
        .unwrap();
    model.update_model().unwrap();

    let file = model.export_tree("singlet");
    let render_before = model.tree.render();
    model.restore_tree(&file).unwrap();
    assert_eq!(model.tree.render(), render_before);

    let s1 = model.seq.ifcs()[2].id();
    let n1 = model.tree.find_node(Referent::Interface(s1)).unwrap();
    assert_eq!(model.tree.name(n1).to_string(), "i2");
}
