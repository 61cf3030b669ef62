use pagemodel::{
    ActionKind, AnnotationBundle, I18nBundle, ModelError, ModelOptions, NodeId, NodeKind,
    PageEditModel, SortMode, ValidationState,
    kinds::{KindData, RelativePosition},
};
use serde_json::{Value, json};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn annotations(value: Value) -> AnnotationBundle {
    serde_json::from_value(value).unwrap()
}

fn child(model: &PageEditModel, parent: NodeId, key: &str) -> NodeId {
    model
        .tree()
        .child(parent, key)
        .unwrap_or_else(|| panic!("no child `{key}`"))
}

fn at(model: &PageEditModel, keys: &[&str]) -> NodeId {
    keys.iter()
        .fold(model.root(), |node, key| child(model, node, key))
}

fn child_keys(model: &PageEditModel, parent: NodeId) -> Vec<String> {
    model
        .tree()
        .children(parent)
        .into_iter()
        .map(|c| model.tree().node(c).key.clone())
        .collect()
}

fn assert_contiguous(model: &PageEditModel, parent: NodeId) {
    let mut orders: Vec<usize> = model
        .tree()
        .children(parent)
        .into_iter()
        .map(|c| model.tree().node(c).order)
        .collect();
    orders.sort();
    assert_eq!(orders, (0..orders.len()).collect::<Vec<_>>());
}

fn sections_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sections": {
                "type": "object",
                "properties": {
                    "F1": { "$ref": "#/definitions/Section", "metadata": { "id": "F1" } },
                    "F2": { "$ref": "#/definitions/Section", "metadata": { "id": "F2" } }
                },
                "additionalProperties": { "$ref": "#/definitions/CustomSection" }
            }
        },
        "definitions": {
            "Section": {
                "type": "object",
                "properties": {
                    "visible": { "type": "boolean" },
                    "subsections": {
                        "type": "object",
                        "properties": {
                            "S1": {
                                "type": "object",
                                "metadata": { "id": "S1" },
                                "properties": { "visible": { "type": "boolean" } }
                            }
                        },
                        "additionalProperties": { "$ref": "#/definitions/CustomSection" }
                    }
                }
            },
            "CustomSection": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "relatedFacet": { "type": "string" },
                    "relativePosition": {
                        "type": "string",
                        "enum": ["Before", "After", "Replace"]
                    }
                }
            }
        }
    })
}

fn facets(read_only: bool) -> AnnotationBundle {
    annotations(json!({
        "nodes": [
            {
                "id": "F1",
                "type": "ReferenceFacet",
                "readOnly": read_only,
                "children": [{ "id": "S1", "type": "ReferenceFacet" }]
            },
            { "id": "F2", "type": "ReferenceFacet" }
        ]
    }))
}

#[test]
fn test_custom_section_follows_its_facet() {
    init_log();
    let data = json!({
        "sections": {
            "F1": { "visible": true },
            "F2": { "visible": true },
            "Notes": { "title": "Notes", "relatedFacet": "F1", "relativePosition": "After" }
        }
    });
    let model =
        PageEditModel::new(sections_schema(), data, facets(false), ModelOptions::default())
            .unwrap();

    let sections = at(&model, &["sections"]);
    assert_eq!(child_keys(&model, sections), ["F1", "Notes", "F2"]);
    assert_contiguous(&model, sections);

    let notes = model.tree().node(child(&model, sections, "Notes"));
    assert_eq!(notes.kind, NodeKind::Section);
    assert!(notes.custom);
    assert!(notes.can(ActionKind::Delete));
    assert!(notes.can(ActionKind::OpenSource));
    match &notes.data {
        KindData::Section(data) => {
            assert_eq!(data.related_facet.as_deref(), Some("F1"));
            assert_eq!(data.position, RelativePosition::After);
            assert_eq!(data.anchor, Some(child(&model, sections, "F1")));
        }
        other => panic!("unexpected section data {other:?}"),
    }

    let f1 = model.tree().node(child(&model, sections, "F1"));
    assert!(!f1.custom);
    assert_eq!(f1.annotation_link.as_deref(), Some("F1"));
}

#[test]
fn test_custom_section_before_and_replace() {
    let data = json!({
        "sections": {
            "F1": {},
            "F2": {},
            "Early": { "relatedFacet": "F2", "relativePosition": "Before" },
            "Swap": { "relatedFacet": "F1", "relativePosition": "Replace" }
        }
    });
    let model =
        PageEditModel::new(sections_schema(), data, facets(false), ModelOptions::default())
            .unwrap();

    let sections = at(&model, &["sections"]);
    assert_eq!(child_keys(&model, sections), ["F1", "Swap", "Early", "F2"]);
    assert!(!model.tree().node(child(&model, sections, "F1")).visible);
    assert!(!model.tree().node(child(&model, sections, "F1")).view_node);
    assert!(model.tree().node(child(&model, sections, "Swap")).view_node);
}

#[test]
fn test_custom_section_with_missing_facet_is_kept_inactive() {
    let data = json!({
        "sections": {
            "F1": {},
            "Orphan": { "relatedFacet": "Gone", "relativePosition": "After" }
        }
    });
    let model =
        PageEditModel::new(sections_schema(), data, facets(false), ModelOptions::default())
            .unwrap();

    let orphan = model.tree().node(at(&model, &["sections", "Orphan"]));
    assert_eq!(orphan.state, ValidationState::Invalid);
    assert!(orphan.inactive);
    assert!(orphan.messages[0].deletable);
    assert!(orphan.messages[0].text.contains("Gone"));
    assert!(orphan.can(ActionKind::Delete));
}

#[test]
fn test_read_only_annotation_locks_generated_descendants() {
    let data = json!({
        "sections": {
            "F1": {
                "subsections": {
                    "S1": { "visible": true },
                    "Mine": { "title": "Mine" }
                }
            },
            "F2": {}
        }
    });
    let model =
        PageEditModel::new(sections_schema(), data, facets(true), ModelOptions::default())
            .unwrap();

    let f1 = model.tree().node(at(&model, &["sections", "F1"]));
    assert!(f1.action(ActionKind::Delete).is_some());
    assert!(!f1.can(ActionKind::Delete));
    assert!(!f1.can(ActionKind::Move));

    let s1 = model.tree().node(at(&model, &["sections", "F1", "subsections", "S1"]));
    assert!(!s1.custom);
    let delete = s1.action(ActionKind::Delete).unwrap();
    assert_eq!(
        delete.disabled_reason.as_deref(),
        Some("Source annotation is read-only")
    );
    assert!(!s1.can(ActionKind::Move));

    let mine = model.tree().node(at(&model, &["sections", "F1", "subsections", "Mine"]));
    assert!(mine.custom);
    assert!(mine.can(ActionKind::Delete));
    assert!(mine.can(ActionKind::Move));

    let f2 = model.tree().node(at(&model, &["sections", "F2"]));
    assert!(f2.can(ActionKind::Delete));
}

#[test]
fn test_read_only_lock_reaches_members_linked_elsewhere() {
    let bundle = annotations(json!({
        "nodes": [
            { "id": "F1", "type": "ReferenceFacet", "readOnly": true },
            { "id": "S1", "type": "ReferenceFacet" },
            { "id": "F2", "type": "ReferenceFacet" }
        ]
    }));
    let data = json!({
        "sections": {
            "F1": {
                "subsections": {
                    "S1": { "visible": true },
                    "Mine": { "title": "Mine" }
                }
            },
            "F2": { "subsections": { "S1": { "visible": true } } }
        }
    });
    let model = PageEditModel::new(sections_schema(), data, bundle, ModelOptions::default())
        .unwrap();

    let s1 = model.tree().node(at(&model, &["sections", "F1", "subsections", "S1"]));
    assert!(!s1.custom);
    assert_eq!(s1.annotation_link.as_deref(), Some("S1"));
    assert_eq!(
        s1.action(ActionKind::Delete)
            .and_then(|a| a.disabled_reason.as_deref()),
        Some("Source annotation is read-only")
    );
    assert!(!s1.can(ActionKind::Move));

    let mine = model.tree().node(at(&model, &["sections", "F1", "subsections", "Mine"]));
    assert!(mine.custom);
    assert!(mine.can(ActionKind::Delete));
    assert!(mine.can(ActionKind::Move));

    let other = model.tree().node(at(&model, &["sections", "F2", "subsections", "S1"]));
    assert!(other.can(ActionKind::Delete));
}

#[test]
fn test_unlinked_member_is_demoted_to_read_only() {
    let schema = json!({
        "type": "object",
        "properties": {
            "sections": {
                "type": "object",
                "properties": {
                    "F1": { "type": "object", "metadata": { "id": "F1" } },
                    "Stray": { "type": "object" }
                }
            }
        }
    });
    let data = json!({ "sections": { "F1": {}, "Stray": {} } });
    let model = PageEditModel::new(schema, data, facets(false), ModelOptions::default()).unwrap();

    let stray = model.tree().node(at(&model, &["sections", "Stray"]));
    assert!(stray.action(ActionKind::Delete).is_none());
    assert!(!stray.can(ActionKind::Move));
    assert!(model.allowed_drop_range(stray.id()).unwrap().is_empty());

    let f1 = model.tree().node(at(&model, &["sections", "F1"]));
    assert!(f1.can(ActionKind::Move));
}

#[test]
fn test_move_custom_section_within_range() {
    let data = json!({
        "sections": {
            "F1": {},
            "F2": {},
            "Notes": { "relatedFacet": "F2", "relativePosition": "After" }
        }
    });
    let mut model =
        PageEditModel::new(sections_schema(), data, facets(false), ModelOptions::default())
            .unwrap();
    let sections = at(&model, &["sections"]);
    let notes = child(&model, sections, "Notes");

    let ranges = model.allowed_drop_range(notes).unwrap();
    assert_eq!(ranges.len(), 1);
    assert!(ranges[0].contains(0) && ranges[0].contains(2));

    let targets = model.find_allowed_drop_aggregations(notes).unwrap();
    assert!(targets.iter().any(|t| t.collection == sections));

    assert!(model.move_node(notes, sections, 0).unwrap());
    assert_eq!(child_keys(&model, sections), ["Notes", "F1", "F2"]);
    assert_contiguous(&model, sections);

    assert!(!model.move_node(notes, sections, 7).unwrap());
    let root = model.root();
    assert!(matches!(
        model.move_node(notes, root, 0),
        Err(ModelError::NotACollection { .. })
    ));
}

#[test]
fn test_move_never_replaces_a_member_with_the_same_key() {
    let data = json!({
        "sections": {
            "F1": {
                "subsections": {
                    "Mine": { "title": "A" },
                    "Other": { "title": "C" }
                }
            },
            "F2": { "subsections": { "Mine": { "title": "B" } } }
        }
    });
    let mut model = PageEditModel::new(
        sections_schema(),
        data.clone(),
        facets(false),
        ModelOptions::default(),
    )
    .unwrap();
    let own = at(&model, &["sections", "F1", "subsections"]);
    let foreign = at(&model, &["sections", "F2", "subsections"]);
    let mine = child(&model, own, "Mine");

    assert_eq!(model.allowed_drop_range(mine).unwrap().len(), 1);
    let targets = model.find_allowed_drop_aggregations(mine).unwrap();
    assert!(targets.iter().any(|t| t.collection == own));
    assert!(!targets.iter().any(|t| t.collection == foreign));

    assert!(!model.move_node(mine, foreign, 0).unwrap());
    assert_eq!(model.tree().parent(mine), Some(own));
    assert_eq!(model.to_value(), data);

    let other = child(&model, own, "Other");
    assert!(model.move_node(other, foreign, 0).unwrap());
    assert_eq!(model.tree().parent(other), Some(foreign));
    assert_eq!(
        model.tree().node(other).path.to_string(),
        "/sections/F2/subsections/Other"
    );
    let value = model.to_value();
    assert_eq!(value["sections"]["F2"]["subsections"]["Mine"], json!({ "title": "B" }));
    assert_eq!(value["sections"]["F2"]["subsections"]["Other"], json!({ "title": "C" }));
    assert_contiguous(&model, own);
    assert_contiguous(&model, foreign);
}

fn table_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "table": {
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["ResponsiveTable", "GridTable", "AnalyticalTable", "TreeTable"]
                    },
                    "columns": {
                        "type": "object",
                        "properties": {
                            "DataField::Price": {
                                "type": "object",
                                "metadata": { "id": "DataField::Price" },
                                "properties": { "width": { "type": "string" } }
                            },
                            "DataFieldForAction::Svc.Approve": {
                                "type": "object",
                                "metadata": { "id": "DataFieldForAction::Svc.Approve" },
                                "properties": { "type": { "type": "string" } }
                            }
                        },
                        "additionalProperties": {
                            "type": "object",
                            "properties": {
                                "header": { "type": "string" },
                                "extensionType": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}

#[test]
fn test_column_extension_mismatch_keeps_column_inactive() {
    init_log();
    let data = json!({
        "table": {
            "type": "ResponsiveTable",
            "columns": {
                "DataField::Price": { "width": "10rem" },
                "Fits": { "header": "Fits", "extensionType": "ResponsiveTableColumnsExtension" },
                "Wrong": { "header": "Wrong", "extensionType": "GridTableColumnsExtension" }
            }
        }
    });
    let model = PageEditModel::new(
        table_schema(),
        data,
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();

    let columns = at(&model, &["table", "columns"]);
    assert_eq!(model.tree().node(columns).kind, NodeKind::Columns);

    let wrong = model.tree().node(child(&model, columns, "Wrong"));
    assert_eq!(wrong.kind, NodeKind::Column);
    assert_eq!(wrong.state, ValidationState::Invalid);
    assert!(wrong.inactive);
    assert!(wrong.can(ActionKind::Delete));

    let fits = model.tree().node(child(&model, columns, "Fits"));
    assert_eq!(fits.state, ValidationState::Valid);
    assert!(!fits.inactive);

    let price = child(&model, columns, "DataField::Price");
    assert_eq!(model.tree().node(price).sortable, SortMode::ReadOnly);
    assert_eq!(model.tree().technical_name(price).as_deref(), Some("Price"));
    assert_eq!(
        model.display_name(price, &I18nBundle::new()).unwrap(),
        "Price"
    );
}

#[test]
fn test_action_like_columns_form_their_own_move_group() {
    let data = json!({
        "table": {
            "columns": {
                "DataField::Price": {},
                "DataFieldForAction::Svc.Approve": {},
                "Extra": { "header": "Extra" }
            }
        }
    });
    let bundle = annotations(json!({
        "nodes": [
            { "id": "DataField::Price", "type": "DataField" },
            { "id": "DataFieldForAction::Svc.Approve", "type": "DataFieldForAction" }
        ]
    }));
    let model = PageEditModel::new(table_schema(), data, bundle, ModelOptions::default())
        .unwrap();

    let approve = at(&model, &["table", "columns", "DataFieldForAction::Svc.Approve"]);
    let price = at(&model, &["table", "columns", "DataField::Price"]);
    assert_eq!(model.tree().move_group(approve).as_deref(), Some("actions"));
    assert_eq!(model.tree().move_group(price).as_deref(), Some("columns"));

    let ranges = model.allowed_drop_range(price).unwrap();
    assert_eq!(ranges.len(), 1);
    assert_eq!((ranges[0].start, ranges[0].end), (1, 2));
}

#[test]
fn test_any_of_skips_keys_of_unmatched_alternative() {
    let schema = json!({
        "type": "object",
        "properties": {
            "settings": {
                "anyOf": [
                    { "$ref": "#/definitions/Plain" },
                    { "$ref": "#/definitions/Chart" }
                ]
            }
        },
        "definitions": {
            "Plain": {
                "type": "object",
                "properties": { "text": { "type": "string" }, "mode": { "type": "string" } }
            },
            "Chart": {
                "type": "object",
                "properties": {
                    "measure": { "type": "string" },
                    "mode": { "type": "string", "enum": ["Bar", "Line"] }
                }
            }
        }
    });
    let data = json!({ "settings": { "measure": "Price", "mode": "Bar" } });
    let mut model = PageEditModel::new(
        schema,
        data,
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();

    let settings = at(&model, &["settings"]);
    let state = |model: &PageEditModel, name: &str| model.tree().node(settings).properties[name].state;
    assert_eq!(state(&model, "measure"), ValidationState::Valid);
    assert_eq!(state(&model, "mode"), ValidationState::Valid);
    assert_eq!(state(&model, "text"), ValidationState::Skipped);

    model.revalidate();
    assert_eq!(state(&model, "text"), ValidationState::Skipped);

    model
        .update_data(json!({ "settings": { "text": "Hello", "measure": "Price" } }))
        .unwrap();
    assert_eq!(state(&model, "text"), ValidationState::Valid);
    assert_eq!(state(&model, "measure"), ValidationState::Valid);
    assert_eq!(state(&model, "mode"), ValidationState::Valid);
}

#[test]
fn test_invalid_value_under_read_only_annotation_stays_locked() {
    let schema = json!({
        "type": "object",
        "properties": {
            "settings": {
                "anyOf": [
                    { "$ref": "#/definitions/Bars" },
                    { "$ref": "#/definitions/Lines" }
                ]
            }
        },
        "definitions": {
            "Bars": {
                "type": "object",
                "metadata": { "id": "Chart" },
                "properties": {
                    "mode": { "type": "string", "enum": ["Bar"] },
                    "panel": {
                        "type": "object",
                        "properties": { "title": { "type": "string" } }
                    }
                }
            },
            "Lines": {
                "type": "object",
                "properties": { "mode": { "type": "string", "enum": ["Line"] } }
            }
        }
    });
    let data = json!({ "settings": { "mode": "Pie", "panel": { "title": "T" } } });
    let build = |read_only: bool| {
        PageEditModel::new(
            schema.clone(),
            data.clone(),
            annotations(json!({
                "nodes": [{ "id": "Chart", "type": "Chart", "readOnly": read_only }]
            })),
            ModelOptions::default(),
        )
        .unwrap()
    };

    let editable = build(false);
    let panel = editable.tree().node(at(&editable, &["settings", "panel"]));
    assert_eq!(panel.state, ValidationState::Invalid);
    assert!(panel.can(ActionKind::Delete));

    let locked = build(true);
    let panel = locked.tree().node(at(&locked, &["settings", "panel"]));
    assert_eq!(panel.state, ValidationState::Invalid);
    assert!(panel.locked);
    assert!(!panel.can(ActionKind::Delete));
}

#[test]
fn test_union_child_reads_the_matched_source() {
    let schema = json!({
        "type": "object",
        "properties": {
            "settings": {
                "anyOf": [
                    { "$ref": "#/definitions/A" },
                    { "$ref": "#/definitions/B" }
                ]
            }
        },
        "definitions": {
            "A": {
                "type": "object",
                "properties": {
                    "a": { "type": "string" },
                    "chartA": {
                        "type": "object",
                        "union": "chart",
                        "properties": { "measure": { "type": "string" } }
                    }
                }
            },
            "B": {
                "type": "object",
                "properties": {
                    "b": { "type": "string" },
                    "chartB": {
                        "type": "object",
                        "union": "chart",
                        "properties": { "measure": { "type": "string" } }
                    }
                }
            }
        }
    });
    let data = json!({ "settings": { "b": "x", "chartB": { "measure": "Price" } } });
    let mut model = PageEditModel::new(
        schema,
        data.clone(),
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();

    let settings = at(&model, &["settings"]);
    let chart = child(&model, settings, "chart");
    let node = model.tree().node(chart);
    assert_eq!(node.path.to_string(), "/settings/chartB");
    let variants: Vec<&str> = node.variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(variants, ["B"]);
    assert_eq!(node.state, ValidationState::Valid);

    let properties = &model.tree().node(settings).properties;
    assert_eq!(properties["a"].state, ValidationState::Skipped);
    assert_eq!(properties["b"].state, ValidationState::Valid);
    assert_eq!(model.to_value(), data);

    let data = json!({ "settings": { "a": "y", "chartA": { "measure": "Qty" } } });
    model.update_data(data.clone()).unwrap();
    assert_eq!(model.tree().node(chart).path.to_string(), "/settings/chartA");
    assert_eq!(model.to_value(), data);
}

#[test]
fn test_custom_action_anchor() {
    let schema = json!({
        "type": "object",
        "properties": {
            "header": {
                "type": "object",
                "properties": {
                    "actions": {
                        "type": "object",
                        "properties": {
                            "DataFieldForAction::Svc.Approve": {
                                "type": "object",
                                "properties": { "visible": { "type": "boolean" } }
                            }
                        },
                        "additionalProperties": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string" },
                                "anchor": { "type": "string" },
                                "placement": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    });
    let data = json!({
        "header": {
            "actions": {
                "DataFieldForAction::Svc.Approve": { "visible": true },
                "Next": { "text": "Next", "anchor": "DataFieldForAction::Svc.Approve" },
                "Lost": { "text": "Lost", "anchor": "Removed" }
            }
        }
    });
    let model = PageEditModel::new(
        schema,
        data,
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();

    let actions = at(&model, &["header", "actions"]);
    assert_eq!(model.tree().node(actions).kind, NodeKind::Actions);
    assert!(model.tree().node(actions).can(ActionKind::Add));

    let next = model.tree().node(child(&model, actions, "Next"));
    assert_eq!(next.kind, NodeKind::Action);
    assert_eq!(next.state, ValidationState::Valid);

    let lost = model.tree().node(child(&model, actions, "Lost"));
    assert_eq!(lost.state, ValidationState::Invalid);
    assert!(lost.inactive);
    assert_eq!(lost.messages.len(), 1);
}

#[test]
fn test_last_view_cannot_be_deleted() {
    let schema = json!({
        "type": "object",
        "properties": {
            "views": {
                "type": "object",
                "properties": {
                    "tab1": {
                        "type": "object",
                        "metadata": { "id": "tab1" },
                        "properties": { "key": { "type": "string" } }
                    }
                },
                "additionalProperties": {
                    "type": "object",
                    "properties": { "key": { "type": "string" } }
                }
            }
        }
    });
    let data = json!({ "views": { "tab1": { "key": "tab1" }, "mine": { "key": "mine" } } });
    let model = PageEditModel::new(
        schema,
        data,
        annotations(json!({ "nodes": [{ "id": "tab1", "type": "SelectionPresentationVariant" }] })),
        ModelOptions {
            suppressed_view_id: Some("mine".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let tab1 = model.tree().node(at(&model, &["views", "tab1"]));
    assert_eq!(tab1.kind, NodeKind::View);
    assert_eq!(
        tab1.action(ActionKind::Delete)
            .and_then(|a| a.disabled_reason.as_deref()),
        Some("At least one view is required")
    );

    let mine = model.tree().node(at(&model, &["views", "mine"]));
    assert_eq!(
        mine.action(ActionKind::Delete)
            .and_then(|a| a.disabled_reason.as_deref()),
        Some("View is suppressed")
    );
}

#[test]
fn test_update_data_adds_and_removes_dynamic_nodes() {
    let mut model = PageEditModel::new(
        sections_schema(),
        json!({ "sections": { "F1": {}, "A": { "title": "A" } } }),
        facets(false),
        ModelOptions::default(),
    )
    .unwrap();
    let sections = at(&model, &["sections"]);
    assert!(model.tree().child(sections, "A").is_some());

    model
        .update_data(json!({ "sections": { "F1": {}, "B": { "title": "B" } } }))
        .unwrap();
    assert!(model.tree().child(sections, "A").is_none());
    assert!(model.tree().child(sections, "B").is_some());
    assert!(model.tree().child(sections, "F2").is_some());
    assert_contiguous(&model, sections);
}

#[test]
fn test_round_trip_and_paths() {
    let data = json!({
        "sections": {
            "F1": { "visible": false, "subsections": { "S1": { "visible": true } } },
            "F2": {},
            "Notes": { "title": "Notes", "relatedFacet": "F2", "relativePosition": "Before" }
        }
    });
    let model = PageEditModel::new(
        sections_schema(),
        data.clone(),
        facets(false),
        ModelOptions::default(),
    )
    .unwrap();
    assert_eq!(model.to_value(), data);

    let tree = model.tree();
    for id in tree.descendants(model.root()) {
        if let Some(parent) = tree.parent(id) {
            assert_eq!(tree.node(id).path.parent(), Some(tree.node(parent).path.clone()));
        }
        assert_contiguous(&model, id);
    }
}

#[test]
fn test_round_trip_drops_undeclared_keys() {
    let schema = json!({
        "type": "object",
        "properties": { "title": { "type": "string" } }
    });
    let model = PageEditModel::new(
        schema,
        json!({ "title": "Page", "unknown": 1 }),
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();
    assert_eq!(model.to_value(), json!({ "title": "Page" }));
}

#[test]
fn test_revalidate_is_idempotent() {
    let data = json!({
        "sections": {
            "F1": {},
            "Orphan": { "relatedFacet": "Gone" },
            "Notes": { "relatedFacet": "F1" }
        }
    });
    let mut model =
        PageEditModel::new(sections_schema(), data, facets(false), ModelOptions::default())
            .unwrap();
    let snapshot = |model: &PageEditModel| {
        model
            .tree()
            .descendants(model.root())
            .into_iter()
            .map(|id| {
                let node = model.tree().node(id);
                (node.state, node.actions.clone(), node.view_node)
            })
            .collect::<Vec<_>>()
    };
    let before = snapshot(&model);
    model.revalidate();
    model.revalidate();
    assert_eq!(before, snapshot(&model));
}

#[test]
fn test_display_names_resolve_i18n() {
    let schema = json!({
        "type": "object",
        "properties": {
            "header": { "type": "object", "description": "{i18n>HEADER}" },
            "footerBar": { "type": "object" }
        }
    });
    let model = PageEditModel::new(
        schema,
        json!({}),
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();
    let bundle: I18nBundle = [("HEADER", "Page Header")].into_iter().collect();

    let header = at(&model, &["header"]);
    assert_eq!(model.display_name(header, &bundle).unwrap(), "Page Header");
    let footer = at(&model, &["footerBar"]);
    assert_eq!(model.display_name(footer, &bundle).unwrap(), "Footer Bar");
}

#[test]
fn test_cyclic_schema_is_reported() {
    let schema = json!({
        "type": "object",
        "properties": { "node": { "$ref": "#/definitions/Node" } },
        "definitions": {
            "Node": {
                "type": "object",
                "properties": { "next": { "$ref": "#/definitions/Node" } }
            }
        }
    });
    let err = PageEditModel::new(
        schema,
        json!({}),
        AnnotationBundle::default(),
        ModelOptions {
            max_depth: 16,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::RecursionLimit { limit: 16, .. }));
}

#[test]
fn test_root_data_must_fit_root_type() {
    let err = PageEditModel::new(
        sections_schema(),
        json!(["not", "a", "page"]),
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));

    let mut model = PageEditModel::new(
        sections_schema(),
        Value::Null,
        AnnotationBundle::default(),
        ModelOptions::default(),
    )
    .unwrap();
    assert!(model.update_data(json!("text")).is_err());
    assert_eq!(model.data(), &Value::Null);
}
