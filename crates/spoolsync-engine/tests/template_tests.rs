//! Tests for TemplateSet: template selection, filename rendering, render context

mod common;

use common::*;
use serde_json::json;
use spoolsync_core::{Error, Filament, Suffix};

// ===========================================================================
// Template selection
// ===========================================================================

#[test]
fn selects_material_template_then_default() {
    let dir = template_dir(STANDARD_TEMPLATES);
    let templates = template_set(&dir);
    let ini = Suffix::new("ini");

    let pla = filament(1, "Acme", "Red", Some("PLA"));
    let petg = filament(2, "Acme", "Blue", Some("PETG"));
    let bare = filament(3, "Acme", "Grey", None);

    assert_eq!(templates.template_name_for(&pla, &ini).unwrap(), "PLA.ini.template");
    assert_eq!(templates.template_name_for(&petg, &ini).unwrap(), "default.ini.template");
    assert_eq!(templates.template_name_for(&bare, &ini).unwrap(), "default.ini.template");
}

#[test]
fn lookup_reports_missing_as_none() {
    let dir = template_dir(STANDARD_TEMPLATES);
    let templates = template_set(&dir);
    assert_eq!(
        templates.lookup("PLA.ini.template".into()).unwrap().as_deref(),
        Some("PLA.ini.template")
    );
    assert!(templates.lookup("ABS.ini.template".into()).unwrap().is_none());
}

#[test]
fn missing_default_is_template_missing() {
    let dir = template_dir(&[("default.ini.template", "x")]);
    let templates = template_set(&dir);
    let f = filament(1, "Acme", "Red", Some("PLA"));

    let err = templates.render(&f, &Suffix::new("json")).unwrap_err();
    match err {
        Error::TemplateMissing { suffix, name } => {
            assert_eq!(suffix, "json");
            assert_eq!(name, "default.json.template");
        }
        other => panic!("expected TemplateMissing, got {:?}", other),
    }
}

// ===========================================================================
// Render context
// ===========================================================================

#[test]
fn render_exposes_program_metadata_and_suffix() {
    let dir = template_dir(&[(
        "default.ini.template",
        "{{ sm2s.name }} {{ sm2s.version }} {{ sm2s.slicer_suffix }}",
    )]);
    let templates = template_set(&dir);
    let f = filament(1, "Acme", "Red", None);

    let text = templates.render(&f, &Suffix::new("ini")).unwrap();
    assert_eq!(text, "spoolsync 0.1.0 ini\n");
}

#[test]
fn render_exposes_time() {
    let dir = template_dir(&[(
        "default.ini.template",
        "{{ sm2s.now_int > 0 }}|{{ sm2s.now | length > 0 }}",
    )]);
    let templates = template_set(&dir);
    let f = filament(1, "Acme", "Red", None);

    let text = templates.render(&f, &Suffix::new("ini")).unwrap();
    assert_eq!(text, "true|true\n");
}

#[test]
fn render_exposes_nested_and_extra_attributes() {
    let dir = template_dir(&[(
        "default.ini.template",
        "{{ vendor.name }}/{{ settings_bed_temp }}/{{ extra.note }}",
    )]);
    let templates = template_set(&dir);
    let f: Filament = serde_json::from_value(json!({
        "id": 4,
        "name": "Red",
        "vendor": { "name": "Acme" },
        "settings_bed_temp": 60,
        "extra": { "note": "dry first" }
    }))
    .unwrap();

    let text = templates.render(&f, &Suffix::new("ini")).unwrap();
    assert_eq!(text, "Acme/60/dry first\n");
}

#[test]
fn render_keeps_template_trailing_newline() {
    let dir = template_dir(&[("default.ini.template", "a = 1\n")]);
    let templates = template_set(&dir);
    let f = filament(1, "Acme", "Red", None);
    assert_eq!(templates.render(&f, &Suffix::new("ini")).unwrap(), "a = 1\n\n");
}

#[test]
fn render_error_names_the_template() {
    let dir = template_dir(&[
        ("default.ini.template", "x"),
        ("PLA.ini.template", "{{ 1 + }}"),
    ]);
    let templates = template_set(&dir);
    let f = filament(1, "Acme", "Red", Some("PLA"));

    let err = templates.render(&f, &Suffix::new("ini")).unwrap_err();
    match err {
        Error::TemplateError { name, .. } => assert_eq!(name, "PLA.ini.template"),
        other => panic!("expected TemplateError, got {:?}", other),
    }
}

// ===========================================================================
// Filenames
// ===========================================================================

#[test]
fn builtin_filename_is_vendor_name_suffix() {
    let dir = template_dir(STANDARD_TEMPLATES);
    let templates = template_set(&dir);
    let f = filament(7, "Acme", "PLA Red", Some("PLA"));

    assert_eq!(templates.filename(&f, &Suffix::new("ini")).unwrap(), "Acme-PLA Red.ini");
    assert_eq!(templates.filename(&f, &Suffix::new("json")).unwrap(), "Acme-PLA Red.json");
}

#[test]
fn filename_template_overrides_builtin_and_is_trimmed() {
    let dir = template_dir(&[(
        "filename.template",
        "{{ id }}_{{ material }}.{{ sm2s.slicer_suffix }}\n",
    )]);
    let templates = template_set(&dir);
    let f = filament(7, "Acme", "PLA Red", Some("PLA"));

    assert_eq!(templates.filename(&f, &Suffix::new("ini")).unwrap(), "7_PLA.ini");
}

#[test]
fn filename_strips_path_separators() {
    let dir = template_dir(STANDARD_TEMPLATES);
    let templates = template_set(&dir);
    let f = filament(7, "Acme", "../PLA\\Red", None);

    assert_eq!(
        templates.filename(&f, &Suffix::new("ini")).unwrap(),
        "Acme-.._PLA_Red.ini"
    );
}

#[test]
fn filename_without_vendor_still_renders() {
    let dir = template_dir(STANDARD_TEMPLATES);
    let templates = template_set(&dir);
    let f: Filament = serde_json::from_value(json!({ "id": 7, "name": "PLA Red" })).unwrap();

    assert_eq!(templates.filename(&f, &Suffix::new("ini")).unwrap(), "-PLA Red.ini");
}

#[test]
fn empty_filename_is_an_error() {
    let dir = template_dir(&[("filename.template", "   ")]);
    let templates = template_set(&dir);
    let f = filament(7, "Acme", "PLA Red", None);

    let err = templates.filename(&f, &Suffix::new("ini")).unwrap_err();
    assert!(matches!(err, Error::TemplateError { .. }));
}
