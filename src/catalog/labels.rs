//! Built-in English labels.
//!
//! Used whenever the translation service has no entry for a key.

pub fn default_label(key: &str) -> Option<&'static str> {
    let label = match key {
        // User
        "user_userid" => "Username",
        "user_firstname" => "First Name",
        "user_lastname" => "Last Name",
        "user_fullname" => "Full Name",
        "user_email" => "Email",
        "user_level" => "User Level",
        "user_register_date" => "Creation Date",
        "user_last_access_date" => "Last Access Date",
        "user_expiration_date" => "User Expiration Date",
        "user_deactivated" => "User Deactivated",
        "user_suspend_date" => "User Suspension Date",
        "user_branch_name" => "Branch Name",

        // Course
        "course_id" => "Course ID",
        "course_code" => "Course Code",
        "course_name" => "Course Name",
        "course_type" => "Course Type",
        "course_status" => "Course Status",
        "course_credits" => "Credits (CEUs)",
        "course_creation_date" => "Course Creation Date",
        "course_date_begin" => "Course Start Date",
        "course_date_end" => "Course End Date",
        "course_category" => "Course Category",
        "course_language" => "Course Language",

        // Enrollment
        "enrollment_level" => "Enrollment Level",
        "enrollment_status" => "Enrollment Status",
        "enrollment_enrollment_date" => "Enrollment Date",
        "enrollment_first_access" => "First Access Date",
        "enrollment_completion_date" => "Completion Date",
        "enrollment_last_access" => "Course Last Access Date",
        "enrollment_score" => "Final Score",
        "enrollment_expiration_date" => "Enrollment Expiration Date",
        "enrollment_session_time" => "Training Material Time",
        "enrollment_credits" => "Credits Earned",

        // Statistics
        "stats_users_enrolled" => "Enrolled Users",
        "stats_completed" => "Completed Users",
        "stats_in_progress" => "Users In Progress",
        "stats_not_started" => "Users Not Started",
        "stats_completed_percentage" => "Completed Users (%)",
        "stats_in_progress_percentage" => "Users In Progress (%)",
        "stats_not_started_percentage" => "Users Not Started (%)",
        "stats_total_session_time" => "Total Training Material Time",

        // Group
        "group_name" => "Group Name",
        "group_members_count" => "Group Members",

        // Certification
        "certification_title" => "Certification Title",
        "certification_code" => "Certification Code",
        "certification_description" => "Certification Description",
        "certification_duration" => "Certification Duration",
        "certification_issued_on" => "Issued On",
        "certification_expires_on" => "Expires On",
        "certification_status" => "Certification Status",

        // Learning plan
        "lp_name" => "Learning Plan Name",
        "lp_code" => "Learning Plan Code",
        "lp_credits" => "Learning Plan Credits (CEUs)",
        "lp_enrollment_date" => "Learning Plan Enrollment Date",
        "lp_completion_date" => "Learning Plan Completion Date",
        "lp_enrollment_status" => "Learning Plan Enrollment Status",
        "lp_completion_percentage" => "Learning Plan Completion (%)",

        // E-commerce
        "ecommerce_transaction_id" => "Transaction ID",
        "ecommerce_transaction_date" => "Transaction Date",
        "ecommerce_payment_status" => "Payment Status",
        "ecommerce_payment_method" => "Payment Method",
        "ecommerce_currency" => "Currency",
        "ecommerce_coupon_code" => "Coupon Code",
        "ecommerce_total_price" => "Total Price",
        "ecommerce_items_count" => "Items",
        "ecommerce_billing_company" => "Company Name",
        "ecommerce_billing_vat" => "VAT Number",

        // Session
        "session_name" => "Session Name",
        "session_date_begin" => "Session Start Date",
        "session_date_end" => "Session End Date",
        "session_tool" => "Webinar Tool",
        "session_instructor" => "Instructor",
        "session_enrollment_date" => "Session Enrollment Date",
        "session_attendance_status" => "Attendance",

        // Groups of the catalogue
        "group.user" => "User",
        "group.course" => "Course",
        "group.enrollment" => "Enrollment",
        "group.stats" => "Statistics",
        "group.group" => "Group",
        "group.certification" => "Certification",
        "group.learning_plan" => "Learning Plan",
        "group.ecommerce" => "E-commerce",
        "group.session" => "Session",
        "group.additional.user" => "User Additional Fields",
        "group.additional.course" => "Course Additional Fields",
        "group.additional.learning_plan" => "Learning Plan Additional Fields",
        "group.additional.enrollment" => "Enrollment Additional Fields",
        "group.additional.session" => "Session Additional Fields",

        // CASE literals
        "yes" => "Yes",
        "no" => "No",
        "user_level.godadmin" => "Superadmin",
        "user_level.admin" => "Power User",
        "user_level.user" => "User",
        "enrollment_status.waiting_list" => "Waiting list",
        "enrollment_status.subscribed" => "Enrolled",
        "enrollment_status.in_progress" => "In Progress",
        "enrollment_status.completed" => "Completed",
        "enrollment_status.suspended" => "Suspended",
        "enrollment_status.overbooking" => "Overbooking",
        "enrollment_level.student" => "Learner",
        "enrollment_level.tutor" => "Tutor",
        "enrollment_level.instructor" => "Instructor",
        "course_type.elearning" => "E-Learning",
        "course_type.classroom" => "ILT",
        "course_type.webinar" => "Webinar",
        "course_status.under_maintenance" => "Under maintenance",
        "course_status.published" => "Published",
        "certification_status.active" => "Active",
        "certification_status.expired" => "Expired",
        "certification_status.archived" => "Archived",
        "lp_status.not_started" => "Not Started",
        "lp_status.in_progress" => "In Progress",
        "lp_status.completed" => "Completed",
        "payment_status.paid" => "Paid",
        "payment_status.pending" => "Pending",
        "attendance.present" => "Present",
        "attendance.absent" => "Absent",
        "attendance.not_set" => "Not set",
        "duration.days" => "days",
        "duration.never" => "Never expires",
        _ => return None,
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldGroup, FieldId};

    #[test]
    fn test_every_base_field_has_a_label() {
        for group in [
            FieldGroup::User,
            FieldGroup::Course,
            FieldGroup::Enrollment,
            FieldGroup::Stats,
            FieldGroup::Group,
            FieldGroup::Certification,
            FieldGroup::LearningPlan,
            FieldGroup::Ecommerce,
            FieldGroup::Session,
        ] {
            for field in FieldId::base_fields(group) {
                assert!(default_label(&field.key()).is_some(), "no label for {}", field);
            }
        }
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(default_label("user_shoe_size"), None);
    }
}
