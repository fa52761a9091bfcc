use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::AnalyticsError;
use crate::models::{Role, ScopeDescriptor, StaffRecord, StudentRecord};

/// Derives the visibility scope for a staff member against the student
/// roster.
///
/// Admins and "special" teachers (no grade assignment) see the whole
/// school. A graded teacher is restricted to students sharing both their
/// grade and their school.
pub fn descriptor_for(
    staff: &StaffRecord,
    students: &[StudentRecord],
) -> Result<ScopeDescriptor, AnalyticsError> {
    let school_id = staff
        .school_id
        .ok_or_else(|| AnalyticsError::not_authorized(staff.id, "no school assignment"))?;

    let subject_allowlist = match (staff.role, staff.grade) {
        (Role::Admin, _) | (Role::Teacher, None) => None,
        (Role::Teacher, Some(grade)) => {
            let allowlist: HashSet<Uuid> = students
                .iter()
                .filter(|s| s.school_id == school_id && s.grade == grade)
                .map(|s| s.id)
                .collect();
            Some(allowlist)
        }
    };

    Ok(ScopeDescriptor {
        school_id,
        subject_allowlist,
    })
}

/// Resolves a principal to its scope, or `NotAuthorized` if the principal
/// is unknown or has no school.
pub async fn resolve(pool: &PgPool, principal: Uuid) -> anyhow::Result<ScopeDescriptor> {
    let staff = db::load_staff(pool, principal)
        .await?
        .ok_or_else(|| AnalyticsError::not_authorized(principal, "unknown staff member"))?;
    let school_id = staff
        .school_id
        .ok_or_else(|| AnalyticsError::not_authorized(principal, "no school assignment"))?;
    let students = db::fetch_students(pool, school_id).await?;
    Ok(descriptor_for(&staff, &students)?)
}

/// A caller-supplied subject id outside the allow-list is rejected, never
/// silently ignored.
pub fn authorize_subject(
    scope: &ScopeDescriptor,
    principal: Uuid,
    subject_id: Uuid,
) -> Result<(), AnalyticsError> {
    if scope.permits(subject_id) {
        Ok(())
    } else {
        Err(AnalyticsError::not_authorized(
            principal,
            format!("subject {subject_id} is outside the principal's scope"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(school_id: Uuid, grade: i32) -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            school_id,
            full_name: "Milo Andersen".to_string(),
            grade,
        }
    }

    fn teacher(school_id: Option<Uuid>, grade: Option<i32>) -> StaffRecord {
        StaffRecord {
            id: Uuid::new_v4(),
            school_id,
            full_name: "Dana Whitfield".to_string(),
            role: Role::Teacher,
            grade,
        }
    }

    #[test]
    fn admin_sees_whole_school() {
        let school_id = Uuid::new_v4();
        let admin = StaffRecord {
            id: Uuid::new_v4(),
            school_id: Some(school_id),
            full_name: "Robin Hale".to_string(),
            role: Role::Admin,
            grade: None,
        };
        let scope = descriptor_for(&admin, &[student(school_id, 5)]).unwrap();
        assert!(scope.subject_allowlist.is_none());
        assert!(scope.permits(Uuid::new_v4()));
    }

    #[test]
    fn graded_teacher_is_restricted_to_their_grade() {
        let school_id = Uuid::new_v4();
        let grade5 = student(school_id, 5);
        let grade6 = student(school_id, 6);
        let other_school_grade5 = student(Uuid::new_v4(), 5);

        let scope = descriptor_for(
            &teacher(Some(school_id), Some(5)),
            &[grade5.clone(), grade6.clone(), other_school_grade5.clone()],
        )
        .unwrap();

        assert!(scope.permits(grade5.id));
        assert!(!scope.permits(grade6.id));
        assert!(!scope.permits(other_school_grade5.id));
    }

    #[test]
    fn special_teacher_sees_whole_school() {
        let school_id = Uuid::new_v4();
        let scope = descriptor_for(&teacher(Some(school_id), None), &[student(school_id, 5)])
            .unwrap();
        assert!(scope.subject_allowlist.is_none());
    }

    #[test]
    fn staff_without_school_is_not_authorized() {
        let err = descriptor_for(&teacher(None, Some(5)), &[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::NotAuthorized { .. }));
    }

    #[test]
    fn out_of_scope_subject_is_rejected() {
        let school_id = Uuid::new_v4();
        let in_scope = student(school_id, 5);
        let scope = descriptor_for(&teacher(Some(school_id), Some(5)), &[in_scope.clone()])
            .unwrap();

        assert!(authorize_subject(&scope, Uuid::new_v4(), in_scope.id).is_ok());
        let err = authorize_subject(&scope, Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AnalyticsError::NotAuthorized { .. }));
    }
}
