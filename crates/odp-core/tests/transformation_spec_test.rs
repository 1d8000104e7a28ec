//! Loading transformation files into the typed specification

use odp_core::models::{
    Aggregation, Axis, Derive, FilterOp, PropertyOp, SemanticType, TransformationSpec, Value,
};

const TRANSFORMATION: &str = r#"
[[input_ports]]
id = "berlin-lor-population"

[[input_ports.files]]
source_file_name = "berlin-lor-population-2023-00-00"
target_file_name = "berlin-lor-population-2023-00-00-districts"

[input_ports.files.aggregation]
mode = "group_by"
columns = ["district_id"]

[[input_ports.files.filters]]
key = "planning_area_id"
operation = "starts_with"
value = "01"

[[input_ports.files.columns]]
name = "planning_area_id"
type = "str"
zero_pad = 8

[[input_ports.files.columns]]
name = "district_id"

[input_ports.files.columns.derive]
op = "split"
column = "planning_area_id"
first_n = 2

[[input_ports.files.columns]]
name = "inhabitants"
type = "int"

[[input_ports.files.columns]]
name = "lon"
remove = true

[input_ports.files.columns.derive]
op = "coordinate"
lon_column = "x"
lat_column = "y"
axis = "lon"

[[input_ports.files.columns]]
name = "label"

[input_ports.files.columns.derive]
op = "literal"
value = "Berlin"

[[input_ports.files]]
source_file_name = "berlin-lor-districts"
target_file_name = "berlin-lor-districts"
target_crs = "EPSG:4326"

[[input_ports.files.properties]]
name = "id"
op = "zero_pad"
width = 2

[[input_ports.files.properties]]
name = "name"
op = "rename"
to = "district_name"
"#;

#[test]
fn test_parse_transformation_file() {
    let spec: TransformationSpec = toml::from_str(TRANSFORMATION).unwrap();

    assert_eq!(spec.input_ports.len(), 1);
    assert_eq!(spec.file_count(), 2);

    let table = &spec.input_ports[0].files[0].table;
    assert_eq!(table.aggregation, Aggregation::GroupBy { columns: vec!["district_id".into()] });
    assert_eq!(table.filters[0].operation, FilterOp::StartsWith);
    assert_eq!(table.columns[0].data_type, Some(SemanticType::String));
    assert_eq!(table.columns[0].zero_pad, Some(8));
    assert_eq!(
        table.columns[1].derive,
        Some(Derive::Split { column: "planning_area_id".into(), first_n: Some(2), last_n: None })
    );
    assert!(table.columns[3].remove);
    assert!(matches!(
        table.columns[3].derive,
        Some(Derive::Coordinate { axis: Axis::Lon, ref source_crs, .. }) if source_crs.epsg == 25833
    ));
    assert_eq!(table.columns[4].derive, Some(Derive::Literal { value: Value::str("Berlin") }));
}

#[test]
fn test_parse_geodata_file() {
    let spec: TransformationSpec = toml::from_str(TRANSFORMATION).unwrap();
    let file = &spec.input_ports[0].files[1];

    assert_eq!(file.target_crs.as_ref().map(|c| c.epsg), Some(4326));
    assert!(file.table.columns.is_empty());
    assert_eq!(file.properties.len(), 2);
    assert_eq!(file.properties[0].op, PropertyOp::ZeroPad { width: 2 });
    assert_eq!(file.properties[1].op, PropertyOp::Rename { to: "district_name".into() });
}
