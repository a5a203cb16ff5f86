use crate::auth::Role;
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    check_course_access, db, session, str_param, term_param, HandlerResult, StoreResultExt,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_mine(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Student])?;
    let conn = db(state, req)?;
    let items = store::student_enrollments(conn, s.user_pk).frame(&req.id)?;
    Ok(json!({ "items": items }))
}

fn handle_enroll(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Student])?;
    let conn = db(state, req)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    let id = store::enroll_student(conn, s.user_pk, course.id, &term).frame(&req.id)?;
    Ok(json!({
        "enrollmentId": id,
        "courseCode": course.course_code,
        "term": term,
    }))
}

fn handle_unenroll(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Student])?;
    let conn = db(state, req)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    store::unenroll_student(conn, s.user_pk, course.id, &term).frame(&req.id)?;
    Ok(json!({ "ok": true }))
}

fn handle_for_course(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Admin, Role::Staff])?;
    let conn = db(state, req)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    check_course_access(conn, req, s, course.id, &term)?;
    let students = store::course_enrollments(conn, course.id, &term).frame(&req.id)?;
    Ok(json!({
        "course": course,
        "term": term,
        "students": students,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "enrollments.mine" => handle_mine(state, req),
        "enrollments.enroll" => handle_enroll(state, req),
        "enrollments.unenroll" => handle_unenroll(state, req),
        "enrollments.forCourse" => handle_for_course(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
