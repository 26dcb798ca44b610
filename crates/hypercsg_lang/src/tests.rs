use hypercsg::Space;
use hypercsg::orient::is_oriented_deep;
use hypercsg::primitives::make_hypercube;
use hypercsg::simplicial::volume;
use hypercsg_math::{assert_approx_eq, vector};
use pretty_assertions::assert_eq;

use crate::Env;

/// Environment with `a = [0, 2]^2` and `b = [1, 3]^2`.
fn squares_env() -> Env {
    let mut space = Space::new();
    let a = make_hypercube(&mut space, &vector![1.0, 1.0], &vector![1.0, 1.0]).expect("square a");
    let b = make_hypercube(&mut space, &vector![2.0, 2.0], &vector![1.0, 1.0]).expect("square b");
    let mut env = Env::new(space, 2);
    env.set("a", a);
    env.set("b", b);
    env
}

fn eval_volume(env: &mut Env, src: &str) -> f64 {
    let p = env.eval(src).unwrap_or_else(|e| panic!("error evaluating {src:?}: {e}"));
    assert!(is_oriented_deep(env.space(), p.id));
    volume(env.space(), p)
}

#[test]
fn test_boolean_operators() {
    let mut env = squares_env();
    assert_approx_eq!(eval_volume(&mut env, "a i b"), 1.0);
    assert_approx_eq!(eval_volume(&mut env, "a & b"), 1.0);
    assert_approx_eq!(eval_volume(&mut env, "a u b"), 7.0);
    assert_approx_eq!(eval_volume(&mut env, "a | b"), 7.0);
    assert_approx_eq!(eval_volume(&mut env, "a - b"), 3.0);
    assert_approx_eq!(eval_volume(&mut env, "a \\ b"), 3.0);
    assert_approx_eq!(eval_volume(&mut env, "a m b"), 3.0);
    assert_approx_eq!(eval_volume(&mut env, "~a i b"), 3.0);
    assert_approx_eq!(eval_volume(&mut env, "-(a u b)"), -7.0);
}

#[test]
fn test_empty_and_full() {
    let mut env = squares_env();
    assert_approx_eq!(eval_volume(&mut env, "0 u a"), 4.0);
    assert_approx_eq!(eval_volume(&mut env, "1 i a"), 4.0);
    assert_approx_eq!(eval_volume(&mut env, "~1 i a"), 0.0);

    let full = env.eval("1").expect("full space");
    assert_eq!(full.initial_density, 1);
    assert_eq!(env.space()[full.id].ndim, 2);
}

#[test]
fn test_product() {
    let mut env = squares_env();
    let prism = env.eval("a x {}").expect("prism");
    assert_eq!(env.space().element_counts(prism.id), vec![8, 12, 6, 1]);
    assert_approx_eq!(volume(env.space(), prism), 8.0);

    let err = env.eval("a i (a x {})").expect_err("dimension mismatch");
    assert!(err.message.contains("dimension mismatch"), "{err}");
    assert_eq!(err.offset, 0);
}

#[test]
fn test_variables() {
    let mut env = squares_env();
    assert_approx_eq!(eval_volume(&mut env, "c = a u b"), 7.0);
    assert_approx_eq!(eval_volume(&mut env, "c - a"), 3.0);
    assert_approx_eq!(eval_volume(&mut env, "d2 = e = a i b"), 1.0);
    assert_eq!(env.get("d2"), env.get("e"));

    assert_approx_eq!(eval_volume(&mut env, "c ="), 0.0);
    assert_eq!(env.get("c"), None);

    let err = env.eval("a u c").expect_err("c is unset");
    assert_eq!(err.offset, 4);
    assert_eq!(err.snippet, "c");
    assert!(err.message.contains("undefined variable"), "{err}");
}

#[test]
fn test_schlafli_dimension() {
    let mut env = Env::new(Space::new(), 3);
    assert_approx_eq!(eval_volume(&mut env, "cube = {4,3}"), 8.0);
    assert_eq!(env.ndim(), 3);
    assert_approx_eq!(eval_volume(&mut env, "1 i cube"), 8.0);

    let err = env.eval("{5,3}").expect_err("unsupported");
    assert!(err.message.contains("5,3"), "{err}");
}

#[test]
fn test_scan() {
    let path = std::env::temp_dir().join(format!("hypercsg_lang_scan_{}.txt", std::process::id()));
    let text = "
        4 0-cells:
          1 1
          4 1
          4 4
          1 4
        4 1-cells:
          !0 !1
          !1 !2
          !2 !3
          !3 !0
        1 2-cells:
          !0 !1 !2 !3
    ";
    std::fs::write(&path, text).expect("error writing temporary file");

    let mut env = squares_env();
    let src = format!("b i scan({:?})", path.display().to_string());
    let result = eval_volume(&mut env, &src);
    std::fs::remove_file(&path).ok();
    assert_approx_eq!(result, 4.0);

    let err = env.eval("scan(\"/nonexistent/hypercsg.txt\")").expect_err("missing file");
    assert!(err.message.contains("cannot read"), "{err}");
}

#[test]
fn test_syntax_error_offset() {
    let mut env = squares_env();
    let err = env.eval("a u (b i").expect_err("unclosed parenthesis");
    assert!((7..=8).contains(&err.offset), "{err}");
}
