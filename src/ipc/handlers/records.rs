use crate::auth::Role;
use crate::grade::{self, CreditedRecord};
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    check_course_access, db, opt_str_param, score_param, session, str_param, term_param,
    HandlerResult, StoreResultExt,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, AcademicRecordRow, PersonKind, RecordScore};
use serde_json::json;

fn average_of(records: &[AcademicRecordRow]) -> Option<f64> {
    grade::average_score(records.iter().map(|r| r.score)).map(grade::round_2)
}

fn handle_record(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Staff])?;
    let conn = db(state, req)?;
    let student = store::require_person(conn, PersonKind::Student, str_param(req, "studentId")?)
        .frame(&req.id)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    let score = score_param(req)?;
    check_course_access(conn, req, s, course.id, &term)?;

    let record = store::record_score(
        conn,
        &RecordScore {
            student_pk: student.id,
            course_pk: course.id,
            staff_pk: Some(s.user_pk),
            term,
            score,
        },
    )
    .frame(&req.id)?;
    Ok(json!({ "record": record }))
}

fn handle_mine(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Student])?;
    let conn = db(state, req)?;
    let records = store::student_records(
        conn,
        s.user_pk,
        opt_str_param(req, "academicYear"),
        opt_str_param(req, "semester"),
    )
    .frame(&req.id)?;
    Ok(json!({
        "averageScore": average_of(&records),
        "records": records,
    }))
}

fn handle_gpa(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Student])?;
    let conn = db(state, req)?;
    let records = store::student_records(
        conn,
        s.user_pk,
        opt_str_param(req, "academicYear"),
        opt_str_param(req, "semester"),
    )
    .frame(&req.id)?;
    let credited: Vec<CreditedRecord> = records.iter().map(AcademicRecordRow::credited).collect();
    let breakdown: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "courseCode": r.course_code,
                "academicYear": r.academic_year,
                "semester": r.semester,
                "grade": r.grade,
                "gpaPoints": r.gpa_points,
                "credits": r.credits,
            })
        })
        .collect();
    Ok(json!({
        "gpa": grade::cumulative_gpa(&credited),
        "totalCredits": records.iter().map(|r| r.credits).sum::<i64>(),
        "courses": breakdown,
    }))
}

fn handle_for_course(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Admin, Role::Staff])?;
    let conn = db(state, req)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    check_course_access(conn, req, s, course.id, &term)?;
    let records = store::course_grades(conn, course.id, &term).frame(&req.id)?;
    Ok(json!({
        "course": course,
        "term": term,
        "averageScore": average_of(&records),
        "records": records,
    }))
}

fn handle_for_student(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let student = store::require_person(conn, PersonKind::Student, str_param(req, "studentId")?)
        .frame(&req.id)?;
    let year = opt_str_param(req, "academicYear");
    let semester = opt_str_param(req, "semester");
    let records = store::student_records(conn, student.id, year, semester).frame(&req.id)?;
    let gpa = store::student_gpa(conn, student.id, year, semester).frame(&req.id)?;
    Ok(json!({
        "studentId": student.natural_id,
        "fullName": student.full_name,
        "gpa": gpa,
        "averageScore": average_of(&records),
        "records": records,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "records.record" => handle_record(state, req),
        "records.mine" => handle_mine(state, req),
        "records.gpa" => handle_gpa(state, req),
        "records.forCourse" => handle_for_course(state, req),
        "records.forStudent" => handle_for_student(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
