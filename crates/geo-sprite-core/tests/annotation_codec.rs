use geo_sprite_core::annotation::{generate_annotation, parse_annotation};
use geo_sprite_core::error::SpriteError;
use serde_json::json;

fn fixture() -> serde_json::Value {
    json!({
        "@context": "http://www.w3.org/ns/anno.jsonld",
        "type": "AnnotationPage",
        "items": [
            {
                "@context": [
                    "http://iiif.io/api/extension/georef/1/context.json",
                    "http://www.w3.org/ns/anno.jsonld"
                ],
                "id": "https://annotations.example.org/maps/26e384d4efabdb32",
                "type": "Annotation",
                "motivation": "georeferencing",
                "target": {
                    "type": "SpecificResource",
                    "source": {
                        "id": "https://images.example.org/iiif/scan-001",
                        "type": "ImageService3",
                        "height": 750,
                        "width": 1000
                    },
                    "selector": {
                        "type": "SvgSelector",
                        "value": "<svg><polygon points=\"12,8 988,10 990,742 10,740\" /></svg>"
                    }
                },
                "body": {
                    "type": "FeatureCollection",
                    "transformation": { "type": "polynomial", "options": { "order": 1 } },
                    "features": [
                        {
                            "type": "Feature",
                            "properties": { "resourceCoords": [500, 300] },
                            "geometry": { "type": "Point", "coordinates": [4.899, 52.372] }
                        },
                        {
                            "type": "Feature",
                            "properties": { "resourceCoords": [100.5, 650.25] },
                            "geometry": { "type": "Point", "coordinates": [4.85, 52.35] }
                        }
                    ]
                }
            }
        ]
    })
}

#[test]
fn parses_annotation_page() {
    let maps = parse_annotation(&fixture()).unwrap();
    assert_eq!(maps.len(), 1);
    let map = &maps[0];
    assert_eq!(
        map.id.as_deref(),
        Some("https://annotations.example.org/maps/26e384d4efabdb32")
    );
    assert_eq!(map.resource.id, "https://images.example.org/iiif/scan-001");
    assert_eq!((map.resource.width, map.resource.height), (1000, 750));
    assert_eq!(map.gcps.len(), 2);
    assert_eq!(map.gcps[0].resource, [500.0, 300.0]);
    assert_eq!(map.gcps[0].geo, [4.899, 52.372]);
    assert_eq!(map.gcps[1].resource, [100.5, 650.25]);
    assert_eq!(map.resource_mask.len(), 4);
    assert_eq!(map.resource_mask[0], [12.0, 8.0]);
    assert_eq!(map.resource_mask[3], [10.0, 740.0]);
    assert_eq!(map.transformation.as_ref().unwrap()["type"], "polynomial");
}

#[test]
fn parses_single_annotation() {
    let doc = fixture();
    let item = doc["items"][0].clone();
    let maps = parse_annotation(&item).unwrap();
    assert_eq!(maps.len(), 1);
}

#[test]
fn generate_then_parse_round_trips_records() {
    let maps = parse_annotation(&fixture()).unwrap();
    let doc = generate_annotation(&maps);
    let reparsed = parse_annotation(&doc).unwrap();
    assert_eq!(reparsed, maps);
}

#[test]
fn missing_resource_width_is_malformed() {
    let mut doc = fixture();
    doc["items"][0]["target"]["source"]
        .as_object_mut()
        .unwrap()
        .remove("width");
    match parse_annotation(&doc) {
        Err(SpriteError::MalformedAnnotation(msg)) => assert!(msg.contains("width")),
        other => panic!("expected MalformedAnnotation, got {other:?}"),
    }
}

#[test]
fn missing_resource_id_is_malformed() {
    let mut doc = fixture();
    doc["items"][0]["target"]["source"]
        .as_object_mut()
        .unwrap()
        .remove("id");
    assert!(matches!(
        parse_annotation(&doc),
        Err(SpriteError::MalformedAnnotation(_))
    ));
}

#[test]
fn degenerate_mask_is_malformed() {
    let mut doc = fixture();
    doc["items"][0]["target"]["selector"]["value"] =
        json!("<svg><polygon points=\"0,0 10,10\" /></svg>");
    assert!(matches!(
        parse_annotation(&doc),
        Err(SpriteError::MalformedAnnotation(_))
    ));
}

#[test]
fn unknown_document_type_is_malformed() {
    assert!(matches!(
        parse_annotation(&json!({ "type": "Manifest" })),
        Err(SpriteError::MalformedAnnotation(_))
    ));
}
