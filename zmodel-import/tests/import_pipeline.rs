use glam::DVec2;
use serde_json::Value;

use zmodel_config::ImportConfig;
use zmodel_core::component::{ComponentType, ComponentValue, GroupIdValue};
use zmodel_import::{check_references, export, Importer};
use zmodel_import::source::{
    EntityRecord, SourceBlock, SourceDocument, SourceEntity, SourceLayer,
};

fn rectangle_document() -> SourceDocument {
    let rect = SourceEntity::VertexPolyline {
        record: EntityRecord::new("rect-1", "layer-0"),
        vertices: vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(500.0, 0.0),
            DVec2::new(500.0, 500.0),
            DVec2::new(0.0, 500.0),
        ],
        closed: true,
    };
    SourceDocument {
        name: "矩形样例".to_string(),
        units_code: 2,
        layers: vec![SourceLayer {
            handle: "layer-0".to_string(),
            name: "0".to_string(),
            color_index: 7,
            is_off: false,
            is_locked: false,
        }],
        blocks: vec![SourceBlock {
            handle: "ms".to_string(),
            name: "*Model_Space".to_string(),
            is_model_space: true,
            extents_min: DVec2::ZERO,
            extents_max: DVec2::new(500.0, 500.0),
            entities: vec![rect],
        }],
        groups: Vec::new(),
    }
}

fn component_value(model: &zmodel_core::model::Model, handle: &str, kind: ComponentType) -> Value {
    let component = model
        .element(handle)
        .and_then(|e| e.find(kind))
        .expect("component present");
    serde_json::from_str(component.value_json()).expect("cached value is valid JSON")
}

#[test]
fn closed_rectangle_imports_as_single_path_element() {
    let mut importer = Importer::new(ImportConfig::default());
    let model = importer.import(&rectangle_document()).expect("import");
    assert!(importer.diagnostics().is_empty());

    // 设置 + 图层样式 + 图层 + 默认块样式 + 矩形。
    assert_eq!(model.elements().len(), 5);

    let category = component_value(&model, "rect-1", ComponentType::Category);
    assert_eq!(category, serde_json::json!({"c": 2}));

    let path = component_value(&model, "rect-1", ComponentType::Path);
    assert_eq!(path["c"], Value::Bool(true));
    assert_eq!(path["p"].as_array().map(Vec::len), Some(5));
    assert_eq!(path["v"], serde_json::json!([0, 1, 1, 1, 1]));
    assert_eq!(path["p"][0], path["p"][4]);

    let bbox = component_value(&model, "rect-1", ComponentType::Bbox);
    assert_eq!(bbox["a"], serde_json::json!([0.0, 0.0]));
    assert_eq!(bbox["b"], serde_json::json!([500.0, 500.0]));
}

#[test]
fn rectangle_inherits_its_layer_style() {
    let mut importer = Importer::new(ImportConfig::default());
    let model = importer.import(&rectangle_document()).expect("import");

    let layer_style = model
        .element("layer-0")
        .and_then(|layer| layer.linked_handle(ComponentType::StyleId))
        .expect("layer style link");
    let rect_style = model
        .element("rect-1")
        .and_then(|rect| rect.linked_handle(ComponentType::StyleId))
        .expect("rect style link");
    assert_eq!(rect_style, layer_style);

    let stroke = component_value(&model, layer_style, ComponentType::StrokeStyle);
    assert_eq!(stroke["s"], serde_json::json!({"Pixels": 1.0}));
    assert_eq!(stroke["p"], serde_json::json!(0));
}

#[test]
fn imported_model_passes_reference_validation() {
    let mut importer = Importer::new(ImportConfig::default());
    let model = importer.import(&rectangle_document()).expect("import");
    assert!(check_references(&model).is_clean());
}

#[test]
fn orphaned_group_reference_is_reported_by_handle() {
    let mut importer = Importer::new(ImportConfig::default());
    let mut model = importer.import(&rectangle_document()).expect("import");

    model
        .element_mut("rect-1")
        .expect("rect element")
        .attach(ComponentValue::GroupId(GroupIdValue::new("ghost")))
        .expect("attach group reference");

    let report = check_references(&model);
    assert_eq!(report.missing_count(), 1);
    assert_eq!(report.missing, vec!["ghost".to_string()]);
}

#[test]
fn exported_json_carries_the_wire_shape() {
    let mut importer = Importer::new(ImportConfig::default());
    let model = importer.import(&rectangle_document()).expect("import");

    let text = export::to_json(&model).expect("serialize");
    let wire: Value = serde_json::from_str(&text).expect("parse");
    let elements = wire.as_array().expect("element array");
    assert_eq!(elements.len(), model.elements().len());

    let rect = elements
        .iter()
        .find(|e| e["h"] == Value::String("rect-1".to_string()))
        .expect("rect element on the wire");
    let components = rect["c"].as_array().expect("component array");
    assert_eq!(components[0]["t"], serde_json::json!(5));
    // 组件值作为已编码字符串落盘，须能二次解析。
    let embedded = components[0]["v"].as_str().expect("value is a string");
    let path: Value = serde_json::from_str(embedded).expect("embedded path JSON");
    assert_eq!(path["v"], serde_json::json!([0, 1, 1, 1, 1]));
    // 无引用的组件不携带 lh 字段。
    assert!(components[0].get("lh").is_none());
}
