//! Legacy field lists and sort order.

use tracing::warn;

use crate::model::{
    AdditionalEntity, AdditionalFieldRef, FieldId, FieldSet, LegacyEntity, LegacyFields,
    LegacyOrder, ReportType, SortOrder, SortSelector, SortingOptions,
};

fn prefix(entity: LegacyEntity) -> &'static str {
    match entity {
        LegacyEntity::User => "user_",
        LegacyEntity::Course => "course_",
        LegacyEntity::Enrollment => "enrollment_",
        LegacyEntity::Stat => "stats_",
        LegacyEntity::Group => "group_",
        LegacyEntity::Certification => "certification_",
        LegacyEntity::Plan => "lp_",
        LegacyEntity::Ecommerce => "ecommerce_",
        LegacyEntity::Session => "session_",
    }
}

fn additional_entity(entity: LegacyEntity) -> Option<AdditionalEntity> {
    match entity {
        LegacyEntity::User => Some(AdditionalEntity::User),
        LegacyEntity::Course => Some(AdditionalEntity::Course),
        LegacyEntity::Enrollment => Some(AdditionalEntity::Enrollment),
        LegacyEntity::Plan => Some(AdditionalEntity::LearningPlan),
        LegacyEntity::Session => Some(AdditionalEntity::Session),
        _ => None,
    }
}

/// New field id of legacy field `name` in the `entity` section.
pub fn field_id(entity: LegacyEntity, name: &str) -> Option<FieldId> {
    let name = name.trim();
    if let Some(id) = name.strip_prefix("field_") {
        let entity = additional_entity(entity)?;
        let id = id.parse::<u64>().ok()?;
        return Some(FieldId::Additional(AdditionalFieldRef::new(entity, id)));
    }
    format!("{}{}", prefix(entity), name).parse().ok()
}

/// Mandatory fields first, then every legacy field in `scan` order.
///
/// Unknown names and fields the report type does not accept are skipped.
pub fn translate_fields(
    report_type: ReportType,
    fields: &LegacyFields,
    scan: &[LegacyEntity],
) -> FieldSet {
    let mut set = FieldSet::new();
    for field in report_type.mandatory_fields() {
        set.push_unique(*field);
    }
    for entity in scan {
        for name in fields.for_entity(*entity) {
            match field_id(*entity, name) {
                Some(field) if report_type.accepts(&field) => {
                    set.push_unique(field);
                }
                Some(field) => {
                    warn!(report_type = %report_type, field = %field, "legacy field not available in report type");
                }
                None => {
                    warn!(entity = entity.as_str(), name = name.as_str(), "skipping unknown legacy field");
                }
            }
        }
    }
    set
}

/// Custom sort from the legacy `order` block, when its field is selected.
pub fn translate_order(
    order: Option<&LegacyOrder>,
    scan: &[LegacyEntity],
    fields: &FieldSet,
) -> Option<SortingOptions> {
    let order = order?;
    let raw = order.field.trim();
    let (entity_name, name) = match raw.split_once('.') {
        Some((entity, name)) => (Some(entity), name),
        None => (None, raw),
    };

    let field = scan
        .iter()
        .filter(|entity| entity_name.map_or(true, |e| e == entity.as_str()))
        .find_map(|entity| field_id(*entity, name).filter(|f| fields.contains(f)))?;

    let order_by = if order.direction.eq_ignore_ascii_case("desc") {
        SortOrder::Desc
    } else {
        SortOrder::Asc
    };
    Some(SortingOptions {
        selector: SortSelector::Custom,
        selected_field: Some(field),
        order_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseField, EnrollmentField, UserField};

    const SCAN: &[LegacyEntity] = &[LegacyEntity::User, LegacyEntity::Course, LegacyEntity::Enrollment];

    fn legacy_fields() -> LegacyFields {
        LegacyFields {
            user: vec!["email".into(), "field_12".into(), "shoe_size".into(), "userid".into()],
            course: vec!["code".into()],
            enrollment: vec!["status".into()],
            certification: vec!["title".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_mandatory_first_then_legacy_order() {
        let set = translate_fields(ReportType::UsersCourses, &legacy_fields(), SCAN);
        let keys: Vec<String> = set.iter().map(|f| f.key()).collect();
        assert_eq!(
            keys,
            vec![
                "user_userid",
                "course_name",
                "user_email",
                "user_extrafield_12",
                "course_code",
                "enrollment_status",
            ]
        );
    }

    #[test]
    fn test_field_id_mapping() {
        assert_eq!(
            field_id(LegacyEntity::Plan, "field_3"),
            Some(FieldId::Additional(AdditionalFieldRef::new(AdditionalEntity::LearningPlan, 3)))
        );
        assert_eq!(field_id(LegacyEntity::Stat, "field_3"), None);
        assert_eq!(
            field_id(LegacyEntity::Stat, "completed_percentage").map(|f| f.key()),
            Some("stats_completed_percentage".to_string())
        );
    }

    #[test]
    fn test_order_qualified_and_bare() {
        let set = translate_fields(ReportType::UsersCourses, &legacy_fields(), SCAN);
        let order = LegacyOrder {
            field: "course.code".into(),
            direction: "DESC".into(),
        };
        let sorting = translate_order(Some(&order), SCAN, &set).unwrap();
        assert_eq!(sorting.selected_field, Some(FieldId::Course(CourseField::Code)));
        assert_eq!(sorting.order_by, SortOrder::Desc);

        let bare = LegacyOrder {
            field: "status".into(),
            direction: "asc".into(),
        };
        let sorting = translate_order(Some(&bare), SCAN, &set).unwrap();
        assert_eq!(
            sorting.selected_field,
            Some(FieldId::Enrollment(EnrollmentField::Status))
        );
    }

    #[test]
    fn test_order_on_unselected_field_is_dropped() {
        let set = translate_fields(ReportType::UsersCourses, &legacy_fields(), SCAN);
        let order = LegacyOrder {
            field: "user.lastname".into(),
            direction: "asc".into(),
        };
        assert_eq!(translate_order(Some(&order), SCAN, &set), None);
        assert!(set.contains(&FieldId::User(UserField::Email)));
    }
}
