use geomodel_core::model::fault_topology::{
    CHANNEL_FAULT_RELATIONSHIP_UPDATED, CHANNEL_FAULT_REMOVED,
};
use geomodel_core::{
    FaultRelationship, FaultTopology, StratigraphicColumn, TopologyError, TopologyEvent,
};
use std::cell::RefCell;
use std::rc::Rc;

fn topology(names: &[&str]) -> FaultTopology {
    let mut topology = FaultTopology::new();
    for name in names {
        topology.add_fault(*name);
    }
    topology
}

#[test]
fn relationships_are_symmetric() {
    let mut topology = topology(&["F1", "F2"]);
    topology
        .update_fault_relationship("F1", "F2", FaultRelationship::Abutting)
        .unwrap();
    assert_eq!(
        topology.get_fault_relationship("F2", "F1"),
        FaultRelationship::Abutting
    );
    assert_eq!(topology.abutting_pairs(), vec![("F1", "F2")]);

    topology
        .update_fault_relationship("F2", "F1", FaultRelationship::None)
        .unwrap();
    assert_eq!(
        topology.get_fault_relationship("F1", "F2"),
        FaultRelationship::None
    );
    assert!(topology.abutting_pairs().is_empty());
}

#[test]
fn unknown_faults_are_rejected() {
    let mut topology = topology(&["F1"]);
    let err = topology
        .update_fault_relationship("F1", "ghost", FaultRelationship::Faulted)
        .unwrap_err();
    assert_eq!(err, TopologyError::UnknownFault("ghost".to_string()));

    let err = topology
        .update_fault_stratigraphy_relationship("Sand", "ghost", true)
        .unwrap_err();
    assert_eq!(err, TopologyError::UnknownFault("ghost".to_string()));
}

#[test]
fn removing_fault_cascades_relationships() {
    let mut topology = topology(&["F1", "F2", "F3"]);
    topology
        .update_fault_relationship("F1", "F2", FaultRelationship::Abutting)
        .unwrap();
    topology
        .update_fault_relationship("F2", "F3", FaultRelationship::Faulted)
        .unwrap();
    topology
        .update_fault_stratigraphy_relationship("Sand", "F2", true)
        .unwrap();

    let removed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&removed);
    topology.attach(CHANNEL_FAULT_REMOVED, move |_, event| {
        if let TopologyEvent::FaultRemoved(name) = event {
            sink.borrow_mut().push(name.clone());
        }
        Ok(())
    });

    assert!(topology.remove_fault("F2"));
    assert!(!topology.remove_fault("F2"));
    assert_eq!(*removed.borrow(), vec!["F2".to_string()]);

    assert_eq!(
        topology.get_fault_relationship("F2", "F1"),
        FaultRelationship::None
    );
    assert_eq!(
        topology.get_fault_relationship("F3", "F2"),
        FaultRelationship::None
    );
    assert!(!topology.get_fault_stratigraphic_relationship("Sand", "F2"));
    assert_eq!(topology.faults().collect::<Vec<_>>(), vec!["F1", "F3"]);
}

#[test]
fn failing_listeners_do_not_block_later_ones() {
    let mut topology = topology(&["F1", "F2"]);
    let seen = Rc::new(RefCell::new(Vec::new()));

    topology.attach(CHANNEL_FAULT_RELATIONSHIP_UPDATED, |_, _| {
        Err("view is gone".into())
    });
    topology.attach(CHANNEL_FAULT_RELATIONSHIP_UPDATED, |_, _| {
        panic!("listener bug");
    });
    let sink = Rc::clone(&seen);
    topology.attach(CHANNEL_FAULT_RELATIONSHIP_UPDATED, move |source, event| {
        if let TopologyEvent::FaultRelationshipUpdated {
            first,
            second,
            relationship,
        } = event
        {
            sink.borrow_mut().push((
                first.clone(),
                second.clone(),
                *relationship,
                source.get_fault_relationship(first, second),
            ));
        }
        Ok(())
    });

    topology
        .update_fault_relationship("F1", "F2", FaultRelationship::Abutting)
        .unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![(
            "F1".to_string(),
            "F2".to_string(),
            FaultRelationship::Abutting,
            FaultRelationship::Abutting
        )]
    );
}

#[test]
fn units_cut_by_follow_column_order() {
    let mut column = StratigraphicColumn::new();
    column.add_unit("Sand", None, None).unwrap();
    column.add_unit("Clay", None, None).unwrap();
    column.add_unit("Basement", None, None).unwrap();

    let mut topology = topology(&["F1"]);
    topology
        .update_fault_stratigraphy_relationship("Basement", "F1", true)
        .unwrap();
    topology
        .update_fault_stratigraphy_relationship("Sand", "F1", true)
        .unwrap();
    topology
        .update_fault_stratigraphy_relationship("Sand", "F1", false)
        .unwrap();
    topology
        .update_fault_stratigraphy_relationship("Clay", "F1", true)
        .unwrap();

    assert_eq!(topology.units_cut_by("F1", &column), vec!["Clay", "Basement"]);
    assert_eq!(topology.remove_unit("Clay"), 1);
    assert_eq!(topology.units_cut_by("F1", &column), vec!["Basement"]);
}

#[test]
fn sync_faults_adds_new_and_drops_vanished() {
    let mut topology = topology(&["F1", "F2"]);
    let change = topology.sync_faults(["F2", "F3"]);
    assert_eq!(change.added, vec!["F3".to_string()]);
    assert_eq!(change.removed, vec!["F1".to_string()]);
    assert!(topology.contains_fault("F3"));
    assert!(!topology.contains_fault("F1"));
}
