use domain::CallerContext;

#[test]
fn caller_context_builds() {
    let ctx = CallerContext::new("user-1");

    assert_eq!(ctx.user_id, "user-1");
}

#[test]
fn default_context_is_empty() {
    let ctx = CallerContext::default();

    assert!(ctx.user_id.is_empty());
}
