use crate::auth::Role;
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    db, opt_int_param, patch_str_param, session, str_param, term_param, HandlerResult,
    StoreResultExt,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, CoursePatch, NewCourse, PersonKind};
use serde_json::json;

fn handle_courses_create(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let new = NewCourse {
        course_code: str_param(req, "courseCode")?.to_string(),
        course_name: str_param(req, "courseName")?.to_string(),
        credits: opt_int_param(req, "credits")?,
        description: patch_str_param(req, "description"),
    };
    let course = store::add_course(conn, &state.config, &new).frame(&req.id)?;
    Ok(json!({ "course": course }))
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let code = str_param(req, "courseCode")?;
    let patch = CoursePatch {
        course_name: patch_str_param(req, "courseName"),
        credits: opt_int_param(req, "credits")?,
        description: patch_str_param(req, "description"),
    };
    let course = store::update_course(conn, code, &patch).frame(&req.id)?;
    Ok(json!({ "course": course }))
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin, Role::Staff, Role::Student])?;
    let conn = db(state, req)?;
    let courses = store::list_courses(conn).frame(&req.id)?;
    Ok(json!({ "total": courses.len(), "items": courses }))
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin, Role::Staff, Role::Student])?;
    let conn = db(state, req)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    Ok(json!({ "course": course }))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let staff =
        store::require_person(conn, PersonKind::Staff, str_param(req, "staffId")?).frame(&req.id)?;
    let course = store::require_course(conn, str_param(req, "courseCode")?).frame(&req.id)?;
    let term = term_param(req)?;
    let id = store::assign_course(conn, staff.id, course.id, &term).frame(&req.id)?;
    Ok(json!({
        "assignmentId": id,
        "staffId": staff.natural_id,
        "courseCode": course.course_code,
        "term": term,
    }))
}

fn handle_assignments_mine(state: &mut AppState, req: &Request) -> HandlerResult {
    let s = session(state, req, &[Role::Staff])?;
    let conn = db(state, req)?;
    let items = store::staff_courses(conn, s.user_pk).frame(&req.id)?;
    Ok(json!({ "items": items }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "courses.create" => handle_courses_create(state, req),
        "courses.update" => handle_courses_update(state, req),
        "courses.list" => handle_courses_list(state, req),
        "courses.get" => handle_courses_get(state, req),
        "assignments.create" => handle_assignments_create(state, req),
        "assignments.mine" => handle_assignments_mine(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
