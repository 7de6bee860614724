use geomodel_core::{
    AllSampler, AttributeValue, ConstantElevation, Coord, FaultFields, Geometry,
    OrientationFields, SampledRow, SpatialDataStore, VectorFeature,
};

fn text(value: &str) -> AttributeValue {
    AttributeValue::Text(value.to_string())
}

fn sample(features: &[VectorFeature]) -> Vec<SampledRow> {
    AllSampler.sample(features, &ConstantElevation(0.0), false)
}

fn contact(unit: &str, x: f64) -> VectorFeature {
    VectorFeature::new(Geometry::LineString(vec![Coord::xy(x, 0.0), Coord::xy(x, 1.0)]))
        .with_attribute("unit", text(unit))
}

#[test]
fn contacts_replace_previous_sampling_and_prune_empty_records() {
    let mut store = SpatialDataStore::new();
    let rows = sample(&[contact("Sand", 0.0), contact("Clay", 1.0)]);
    assert_eq!(store.replace_contacts(&rows, Some("unit")), 2);
    assert_eq!(store.record("Sand").unwrap().contact.as_ref().unwrap().len(), 2);

    let rows = sample(&[contact("Clay", 5.0)]);
    assert_eq!(store.replace_contacts(&rows, Some("unit")), 1);
    assert!(store.record("Sand").is_none());
    let clay = store.record("Clay").unwrap().contact.as_ref().unwrap();
    assert!(clay.iter().all(|point| point.x == 5.0));
}

#[test]
fn contacts_without_name_field_only_clear() {
    let mut store = SpatialDataStore::new();
    let rows = sample(&[contact("Sand", 0.0)]);
    store.replace_contacts(&rows, Some("unit"));

    assert_eq!(store.replace_contacts(&rows, None), 0);
    assert!(store.is_empty());
}

#[test]
fn orientations_convert_dip_direction_and_drop_bad_rows() {
    let features = vec![
        VectorFeature::new(Geometry::Point(Coord::xy(1.0, 1.0)))
            .with_attribute("unit", text("Sand"))
            .with_attribute("dipdir", AttributeValue::Number(180.0))
            .with_attribute("dip", AttributeValue::Integer(30)),
        VectorFeature::new(Geometry::Point(Coord::xy(2.0, 2.0)))
            .with_attribute("unit", text("Sand"))
            .with_attribute("dipdir", text("n/a"))
            .with_attribute("dip", AttributeValue::Integer(30)),
        VectorFeature::new(Geometry::Point(Coord::xy(3.0, 3.0)))
            .with_attribute("dipdir", AttributeValue::Number(90.0))
            .with_attribute("dip", AttributeValue::Integer(10)),
    ];
    let fields = OrientationFields {
        strike_field: "dipdir".to_string(),
        dip_field: "dip".to_string(),
        unit_name_field: "unit".to_string(),
        dip_direction: true,
    };

    let mut store = SpatialDataStore::new();
    assert_eq!(store.replace_orientations(&sample(&features), &fields), 1);
    let points = store.record("Sand").unwrap().orientations.as_ref().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].strike, 90.0);
    assert_eq!(points[0].dip, 30.0);
}

#[test]
fn ingestion_kinds_share_one_record_per_name() {
    let mut store = SpatialDataStore::new();
    store.replace_contacts(&sample(&[contact("Sand", 0.0)]), Some("unit"));
    let orientation = VectorFeature::new(Geometry::Point(Coord::xy(0.0, 0.0)))
        .with_attribute("unit", text("Sand"))
        .with_attribute("strike", AttributeValue::Number(10.0))
        .with_attribute("dip", AttributeValue::Number(20.0));
    store.replace_orientations(
        &sample(&[orientation]),
        &OrientationFields {
            strike_field: "strike".to_string(),
            dip_field: "dip".to_string(),
            unit_name_field: "unit".to_string(),
            dip_direction: false,
        },
    );

    let record = store.record("Sand").unwrap();
    assert!(record.contact.is_some());
    assert!(record.orientations.is_some());
    assert_eq!(store.len(), 1);
}

#[test]
fn fault_points_fall_back_to_feature_index_for_names() {
    let features = vec![
        VectorFeature::new(Geometry::LineString(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 0.0)]))
            .with_attribute("name", text("Main"))
            .with_attribute("dip", AttributeValue::Number(60.0)),
        VectorFeature::new(Geometry::LineString(vec![Coord::xy(0.0, 5.0), Coord::xy(1.0, 5.0)])),
    ];
    let fields = FaultFields {
        name_field: Some("name".to_string()),
        dip_field: Some("dip".to_string()),
        ..FaultFields::default()
    };

    let mut store = SpatialDataStore::new();
    let names = store.replace_fault_points(&sample(&features), &fields);
    assert_eq!(
        names.into_iter().collect::<Vec<_>>(),
        vec!["1".to_string(), "Main".to_string()]
    );
    assert_eq!(store.fault_names(), vec!["1", "Main"]);

    let main = store.record("Main").unwrap().fault_points.as_ref().unwrap();
    assert!(main.iter().all(|point| point.dip == Some(60.0)));
    assert!(main.iter().all(|point| point.displacement.is_none()));
}
