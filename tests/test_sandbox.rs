//! Script sandbox tests
//!
//! Runs real scripts through QuickJS and checks the resulting logs, tests
//! and modified context.

mod common;

use pulsescript::config::SandboxConfig;
use pulsescript::scripting::{LogLevel, ScriptContext, ScriptKind, ScriptResult, ScriptSandbox};
use pulsescript::{Request, Response, VariableScope};
use serde_json::json;

fn sandbox() -> ScriptSandbox {
    ScriptSandbox::new(&SandboxConfig::default()).unwrap()
}

fn pre_request(source: &str, ctx: &ScriptContext) -> ScriptResult {
    sandbox().execute(ScriptKind::PreRequest, source, ctx)
}

fn test_script(source: &str, ctx: &ScriptContext) -> ScriptResult {
    sandbox().execute(ScriptKind::Test, source, ctx)
}

fn base_context() -> ScriptContext {
    let store = common::store_with_env(&[("baseUrl", "https://api.example.com")]);
    let request = Request::new("GET", "{{baseUrl}}/users").with_header("Accept", "application/json");
    ScriptContext::from_store(&store, &request)
}

fn response_context() -> ScriptContext {
    let response = Response::new(200, json!({"id": 7, "name": "Ada", "tags": ["a", "b"]}))
        .with_header("Content-Type", "application/json")
        .with_duration(42);
    base_context().with_response(&response)
}

fn messages(result: &ScriptResult) -> Vec<&str> {
    result.logs.iter().map(|l| l.message.as_str()).collect()
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_denylisted_source_never_runs() {
    let result = pre_request("pm.environment.set('a', 1); new Function('return 1')();", &base_context());

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Function constructor is not allowed in scripts"));
    assert!(result.modified_context.is_none());
    assert_eq!(result.logs.len(), 1);
    assert_eq!(result.logs[0].level, LogLevel::Error);
    assert_eq!(
        result.logs[0].message,
        "Script execution error: Function constructor is not allowed in scripts"
    );
}

#[test]
fn test_constructor_indirection_fails_at_runtime() {
    let result = pre_request("const F = (function () {}).constructor; F('return 1')();", &base_context());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Function constructor is not allowed in scripts"));
}

#[test]
fn test_async_constructor_indirection_fails_at_runtime() {
    let source = "const A = Object.getPrototypeOf(async function () {}).constructor; await A('return 1')();";
    let result = pre_request(source, &base_context());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Function constructor is not allowed in scripts"));
}

#[test]
fn test_host_globals_fail_at_runtime() {
    let result = pre_request("globalThis['proc' + 'ess'];", &base_context());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("process is not allowed in scripts"));
}

#[test]
fn test_guards_cannot_be_replaced() {
    let result = pre_request("globalThis.pm = {};", &base_context());
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("TypeError"));
}

#[test]
fn test_syntax_error_is_reported() {
    let result = pre_request("pm.environment.set('a', ", &base_context());
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("SyntaxError: "));
    assert!(result.modified_context.is_none());
}

#[test]
fn test_oversized_script_is_rejected() {
    let config = SandboxConfig {
        max_script_bytes: 16,
        ..SandboxConfig::default()
    };
    let sandbox = ScriptSandbox::new(&config).unwrap();
    let result = sandbox.execute(
        ScriptKind::PreRequest,
        "pm.environment.set('a', 'long value');",
        &base_context(),
    );
    assert!(!result.success);
    assert!(result.error.unwrap().contains("byte limit"));
}

#[test]
fn test_timers_are_inert() {
    let result = pre_request(
        "const id = setTimeout(() => pm.environment.set('late', 1), 0); clearTimeout(id);",
        &base_context(),
    );
    assert!(result.success);
    let ctx = result.modified_context.unwrap();
    assert!(!ctx.environment.contains_key("late"));
}

#[test]
fn test_input_context_is_not_aliased() {
    let ctx = base_context();
    let result = pre_request("pm.environment.set('token', 'abc'); pm.environment.unset('baseUrl');", &ctx);
    assert!(result.success);
    assert_eq!(ctx.environment.get("baseUrl"), Some(&json!("https://api.example.com")));
    assert!(!ctx.environment.contains_key("token"));
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_environment_and_globals() {
    let source = r#"
        pm.environment.set('token', 'abc');
        pm.environment.set('count', 3);
        pm.globals.set('shared', { a: 1 });
        pm.environment.unset('baseUrl');
        pm.info(pm.environment.has('token') + ' ' + pm.globals.get('shared').a);
    "#;
    let result = pre_request(source, &base_context());
    assert!(result.success, "{:?}", result.error);

    let ctx = result.modified_context.as_ref().unwrap();
    assert_eq!(ctx.environment.get("token"), Some(&json!("abc")));
    assert_eq!(ctx.environment.get("count"), Some(&json!(3)));
    assert_eq!(ctx.globals.get("shared"), Some(&json!({"a": 1})));
    assert!(!ctx.environment.contains_key("baseUrl"));

    let logs = messages(&result);
    assert!(logs.contains(&"pm.environment.set('token', \"abc\")"));
    assert!(logs.contains(&"true 1"));
}

#[test]
fn test_variables_reads_every_scope() {
    let mut store = common::store_with_env(&[("x", "env")]);
    store.set(VariableScope::Global, "g", "global");
    store.set(VariableScope::Local, "x", "local");
    let ctx = ScriptContext::from_store(&store, &Request::new("GET", "/"));

    let source = r#"
        pm.info(pm.variables.get('x') + ',' + pm.variables.get('g') + ',' + pm.variables.get('missing'));
        pm.variables.set('fromScript', 'yes');
    "#;
    let result = pre_request(source, &ctx);
    assert!(result.success, "{:?}", result.error);
    assert!(messages(&result).contains(&"local,global,undefined"));
    assert!(messages(&result).contains(&"pm.variables.get('x') -> local"));
    assert_eq!(
        result.modified_context.unwrap().environment.get("fromScript"),
        Some(&json!("yes"))
    );
}

#[test]
fn test_environment_clear_and_to_object() {
    let result = pre_request(
        "pm.info(JSON.stringify(pm.environment.toObject())); pm.environment.clear();",
        &base_context(),
    );
    assert!(result.success);
    assert!(messages(&result).contains(&r#"{"baseUrl":"https://api.example.com"}"#));
    assert!(result.modified_context.unwrap().environment.is_empty());
}

// ============================================================================
// Request
// ============================================================================

#[test]
fn test_request_edits() {
    let source = r#"
        pm.request.headers.add({ key: 'Authorization', value: 'Bearer abc' });
        pm.request.headers.upsert({ key: 'accept', value: 'text/plain' });
        pm.request.url.set(pm.request.url.toString() + '?page=2');
        pm.request.method.set('post');
        pm.request.body.set({ name: 'Ada' });
        pm.request.body.update({ age: 36 });
    "#;
    let result = pre_request(source, &base_context());
    assert!(result.success, "{:?}", result.error);

    let request = result.modified_context.unwrap().request;
    assert_eq!(request.url, "{{baseUrl}}/users?page=2");
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("Authorization"), Some("Bearer abc"));
    assert_eq!(request.header("Accept"), Some("text/plain"));
    assert_eq!(request.headers.len(), 2);
    assert_eq!(request.body, Some(json!({"name": "Ada", "age": 36})));
}

#[test]
fn test_request_header_queries() {
    let source = r#"
        pm.info(String(pm.request.headers.has('ACCEPT')));
        pm.info(pm.request.headers.get('accept'));
        pm.request.headers.remove('Accept');
        pm.info(String(pm.request.headers.has('Accept')));
    "#;
    let result = pre_request(source, &base_context());
    assert!(result.success, "{:?}", result.error);
    let logs = messages(&result);
    assert!(logs.contains(&"true"));
    assert!(logs.contains(&"application/json"));
    assert!(logs.contains(&"false"));
    assert!(result.modified_context.unwrap().request.headers.is_empty());
}

#[test]
fn test_bad_header_argument_is_a_type_error() {
    let result = pre_request("pm.request.headers.add('Authorization');", &base_context());
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("TypeError"));
}

// ============================================================================
// Response and tests
// ============================================================================

#[test]
fn test_response_is_undefined_before_send() {
    let result = pre_request("pm.info(typeof pm.response);", &base_context());
    assert!(result.success);
    assert!(messages(&result).contains(&"undefined"));
}

#[test]
fn test_response_accessors() {
    let source = r#"
        pm.info([pm.response.code(), pm.response.status(), pm.response.responseTime()].join('|'));
        pm.info(pm.response.json().name);
        pm.info(pm.response.headers.get('content-type'));
        pm.environment.set('userId', pm.response.json().id);
    "#;
    let result = test_script(source, &response_context());
    assert!(result.success, "{:?}", result.error);

    let logs = messages(&result);
    assert!(logs.contains(&"200|OK|42"));
    assert!(logs.contains(&"Ada"));
    assert!(logs.contains(&"application/json"));
    assert_eq!(
        result.modified_context.unwrap().environment.get("userId"),
        Some(&json!(7))
    );
}

#[test]
fn test_failed_test_does_not_stop_the_script() {
    let source = r#"
        pm.test('first', function () {
            pm.expect(1).to.eql(2);
        });
        pm.test('second', function () {
            pm.expect(pm.response.json().tags).to.have.length(2);
        });
    "#;
    let result = test_script(source, &response_context());

    assert!(result.success);
    assert_eq!(result.passed_tests(), 1);
    assert_eq!(result.failed_tests(), 1);
    assert!(!result.all_passed());

    let failed = &result.tests[0];
    assert_eq!(failed.name, "first");
    assert_eq!(failed.message.as_deref(), Some("expected 1 to deeply equal 2"));

    let logs = messages(&result);
    assert!(logs.contains(&"✗ Test failed: first - expected 1 to deeply equal 2"));
    assert!(logs.contains(&"✓ Test passed: second"));
    let errors: Vec<_> = result.logs_at(LogLevel::Error).collect();
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_response_assertions() {
    let source = r#"
        pm.test('status', function () { pm.response.to.have.status(200); });
        pm.test('ok', function () { pm.response.to.be.ok; });
        pm.test('header', function () { pm.response.to.have.header('Content-Type'); });
        pm.test('not server error', function () { pm.response.to.not.be.serverError; });
        pm.test('wrong status', function () { pm.response.to.have.status(404); });
    "#;
    let result = test_script(source, &response_context());
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.passed_tests(), 4);
    assert_eq!(result.tests[4].name, "wrong status");
    assert!(!result.tests[4].passed);
}

#[test]
fn test_expectation_chains() {
    let source = r#"
        pm.test('chains', function () {
            const body = pm.response.json();
            pm.expect(body).to.be.an('object');
            pm.expect(body).to.have.property('name', 'Ada');
            pm.expect(body).to.have.keys(['id', 'name', 'tags']);
            pm.expect(body.tags).to.include('a');
            pm.expect(body.tags).to.not.include('z');
            pm.expect(body.id).to.be.above(5).and.below(10);
            pm.expect(body.name).to.match(/^ad/i);
            pm.expect('').to.be.empty;
            pm.expect(null).to.be.null;
            pm.expect(undefined).to.be.undefined;
            pm.expect(true).to.be.true;
            pm.expect(0).to.not.be.ok;
        });
    "#;
    let result = test_script(source, &response_context());
    assert!(result.success, "{:?}", result.error);
    assert!(result.all_passed(), "{:?}", result.tests);
}

#[test]
fn test_patterns_use_script_regex_semantics() {
    let source = r#"
        pm.test('lookahead', function () { pm.expect('abc1').to.match(/^(?=.*\d)[a-z0-9]+$/); });
        pm.test('backreference', function () { pm.expect('abab').toMatch(/^(ab)\1$/); });
        pm.test('global flag', function () {
            const re = /a/g;
            pm.expect('a').to.match(re);
            pm.expect('a').to.match(re);
        });
        pm.test('no match', function () { pm.expect('abc').to.match(/^\d+$/); });
        pm.test('not a string', function () { pm.expect(5).to.match(/5/); });
    "#;
    let result = test_script(source, &base_context());
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.passed_tests(), 3, "{:?}", result.tests);
    assert!(!result.tests[3].passed);
    assert!(result.tests[3].message.as_deref().unwrap().contains("to match /^\\d+$/"));
    assert!(!result.tests[4].passed);
}

#[test]
fn test_keys_allow_extra_properties() {
    let source = r#"
        pm.test('subset', function () { pm.expect({ a: 1, b: 2 }).to.have.keys(['a']); });
        pm.test('missing', function () { pm.expect({ a: 1 }).to.have.keys('a', 'c'); });
    "#;
    let result = test_script(source, &base_context());
    assert!(result.tests[0].passed, "{:?}", result.tests[0]);
    assert!(!result.tests[1].passed);
}

#[test]
fn test_assertion_outside_test_fails_the_script() {
    let source = "pm.info('before'); pm.expect('a').to.eql('b'); pm.info('after');";
    let result = test_script(source, &response_context());

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("expected \"a\" to deeply equal \"b\""));
    let logs = messages(&result);
    assert!(logs.contains(&"before"));
    assert!(!logs.contains(&"after"));
}

#[test]
fn test_thrown_error_keeps_earlier_logs() {
    let result = pre_request("console.log('one', 2); throw new TypeError('boom');", &base_context());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("TypeError: boom"));
    assert_eq!(result.logs[0].level, LogLevel::Log);
    assert_eq!(result.logs[0].message, "one 2");
    assert_eq!(result.logs[1].message, "Script execution error: TypeError: boom");
}

// ============================================================================
// Async and sendRequest
// ============================================================================

#[test]
fn test_async_work_is_awaited() {
    let source = r#"
        const value = await Promise.resolve('later');
        pm.environment.set('async', value);
    "#;
    let result = pre_request(source, &base_context());
    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.modified_context.unwrap().environment.get("async"),
        Some(&json!("later"))
    );
}

#[test]
fn test_rejected_promise_fails_the_script() {
    let result = pre_request("await Promise.reject(new Error('nope'));", &base_context());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("nope"));
}

#[test]
fn test_async_test_rejection_fails_the_test() {
    let source = r#"
        pm.test('async failure', async function () {
            await null;
            pm.expect(1).to.eql(2);
        });
        pm.test('async success', async function () {
            const value = await Promise.resolve(5);
            pm.expect(value).to.eql(5);
        });
        pm.info('after tests');
    "#;
    let result = test_script(source, &base_context());
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tests.len(), 2);
    assert_eq!(result.tests[0].name, "async failure");
    assert!(!result.tests[0].passed);
    assert!(result.tests[0].message.as_deref().unwrap().contains("expected 1 to deeply equal 2"));
    assert_eq!(result.tests[1].name, "async success");
    assert!(result.tests[1].passed);

    // outcomes are recorded before the script moves on
    let logs = messages(&result);
    let failed = logs.iter().position(|m| m.starts_with("✗ Test failed: async failure")).unwrap();
    let after = logs.iter().position(|m| *m == "after tests").unwrap();
    assert!(failed < after);
}

#[test]
fn test_async_test_that_never_settles_fails() {
    let source = "pm.test('stuck', function () { return new Promise(function () {}); });";
    let result = test_script(source, &base_context());
    assert!(result.success, "{:?}", result.error);
    assert!(!result.tests[0].passed);
}

#[test]
fn test_send_request_stub() {
    let source = r#"
        pm.sendRequest('https://example.com/token', function (err, res) {
            pm.environment.set('stubCode', res.code);
        });
        const res = await pm.sendRequest({ url: 'https://example.com', method: 'POST' });
        pm.info('status ' + res.status);
    "#;
    let result = pre_request(source, &base_context());
    assert!(result.success, "{:?}", result.error);

    let logs = messages(&result);
    assert!(logs.contains(&"pm.sendRequest called"));
    assert!(logs.contains(&"Request URL: https://example.com/token"));
    assert!(logs.contains(&"status 200"));
    assert_eq!(
        result.modified_context.unwrap().environment.get("stubCode"),
        Some(&json!(200))
    );
}

#[test]
fn test_console_levels() {
    let result = pre_request(
        "console.warn('w'); console.error('e'); pm.warn('pw'); console.info({ a: 1 });",
        &base_context(),
    );
    assert!(result.success);
    assert_eq!(result.logs_at(LogLevel::Warn).count(), 2);
    assert_eq!(result.logs_at(LogLevel::Error).count(), 1);
    assert!(messages(&result).contains(&r#"{"a":1}"#));
}
