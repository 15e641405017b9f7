use std::fmt::Display;

use crate::ast::{parse_ast::*, petri::*};

use ahash::AHashMap;
use itertools::Itertools;
use tracing::{debug, trace, warn};
/*
This module turns process expressions into Petri net fragments.

Each construct is compiled between an input place and an output place, so a
token put in the input can reach the output by firing the transitions of the construct:
-action : in -> T -> out
-sequence : the children are chained through fresh places
-parallel : a fork transition feeds one fresh place per branch, a join transition waits for both
-choice : both branches share in and out, the first branch to fire takes the token
-priority : a gate transition carrying the priority leads to a fresh place, then the child
-module call : the callee is compiled (or taken from the memo), copied with fresh ids,
 and linked to the caller with a call transition and a return transition

Every id comes from the counter of the Codegen, so ids never collide inside one session,
even when the same module is inlined many times.
A module is marked in progress while it compiles, so a module calling itself
(directly or not) is reported instead of recursing forever.
*/

pub const REC_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    UnknownModule(Option<Pos>, String), //call site (None for a top level request), name
    CyclicModuleCall(Option<Pos>, Vec<String>), //call site closing the cycle, the modules in the cycle
    StackOverflow(String, usize), //module being compiled, depth limit
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnknownModule(_, name) => write!(f, "unknown module {}", name),
            CompileError::CyclicModuleCall(_, cycle) => {
                write!(f, "cyclic module reference: {}", cycle.iter().join(" -> "))
            }
            CompileError::StackOverflow(name, depth) => write!(
                f,
                "module {} is nested more than {} levels deep",
                name, depth
            ),
        }
    }
}

impl std::error::Error for CompileError {}

pub struct Codegen {
    modules: AHashMap<String, Expr>,
    generated: AHashMap<String, PetriModule>,
    in_progress: Vec<String>, //the chain of modules currently compiling
    counter: u32,
    depth: usize,
    max_depth: usize,
}

impl Default for Codegen {
    fn default() -> Self {
        Codegen::with_max_depth(REC_DEPTH)
    }
}

impl Codegen {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Codegen {
            modules: AHashMap::new(),
            generated: AHashMap::new(),
            in_progress: Vec::new(),
            counter: 0,
            depth: 0,
            max_depth,
        }
    }

    //binds a name to a tree, replacing any previous binding (and its compiled fragment)
    pub fn register(&mut self, name: impl Into<String>, root: Expr) {
        let name = name.into();
        if self.generated.remove(&name).is_some() {
            debug!(module = %name, "module redefined, dropping its compiled fragment");
        }
        self.modules.insert(name, root);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(|s| s.as_str()).sorted().collect()
    }

    //reports the first call to a module that is not registered, looking at modules in name order
    pub fn check_calls(&self) -> Result<(), CompileError> {
        for (_, root) in self.modules.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            for call in root.called_modules() {
                if !self.is_registered(call) {
                    return Err(CompileError::UnknownModule(
                        Some(call.loc),
                        call.value.clone(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn generate(&mut self, name: &str) -> Result<PetriModule, CompileError> {
        self.generate_at(name, None)
    }

    fn generate_at(
        &mut self,
        name: &str,
        call_site: Option<Pos>,
    ) -> Result<PetriModule, CompileError> {
        if let Some(module) = self.generated.get(name) {
            trace!(module = name, "already compiled");
            return Ok(module.clone());
        }
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut cycle = self.in_progress[start..].to_vec();
            cycle.push(name.to_string());
            return Err(CompileError::CyclicModuleCall(call_site, cycle));
        }
        let root = self
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownModule(call_site, name.to_string()))?;
        debug!(module = name, "compiling module");
        self.in_progress.push(name.to_string());
        let entry = self.fresh("entry");
        let exit = self.fresh("exit");
        let mut module = PetriModule::new(name.to_string(), entry.clone(), exit.clone());
        let res = self.compile_expr(&root, &entry, &exit, &mut module);
        self.in_progress.pop();
        if let Err(e) = res {
            if self.in_progress.is_empty() {
                warn!(module = name, error = %e, "compilation failed");
            }
            return Err(e);
        }
        debug_assert!(module.validate().is_ok());
        debug!(
            module = name,
            places = module.places.len(),
            transitions = module.transitions.len(),
            arcs = module.arcs.len(),
            "module compiled"
        );
        self.generated.insert(name.to_string(), module.clone());
        Ok(module)
    }

    fn fresh(&mut self, base: &str) -> String {
        let id = format!("{}{}", base, self.counter);
        self.counter += 1;
        id
    }

    //a copy of a fragment where every place and transition gets a new id,
    //keeping the textual prefix of the old one
    fn instantiate(&mut self, sub: &PetriModule) -> PetriModule {
        let mut rename = AHashMap::new();
        for id in sub
            .places
            .iter()
            .map(|p| &p.id)
            .chain(sub.transitions.iter().map(|t| &t.id))
        {
            let base = id.trim_end_matches(|c: char| c.is_ascii_digit());
            let new_id = self.fresh(base);
            rename.insert(id.clone(), new_id);
        }
        let renamed = |id: &String| rename.get(id).cloned().unwrap_or_else(|| id.clone());
        PetriModule {
            name: sub.name.clone(),
            entry: renamed(&sub.entry),
            exit: renamed(&sub.exit),
            places: sub
                .places
                .iter()
                .map(|p| Place { id: renamed(&p.id) })
                .collect(),
            transitions: sub
                .transitions
                .iter()
                .map(|t| Transition {
                    id: renamed(&t.id),
                    priority: t.priority,
                })
                .collect(),
            arcs: sub
                .arcs
                .iter()
                .map(|a| Arc {
                    kind: a.kind,
                    src: renamed(&a.src),
                    dst: renamed(&a.dst),
                })
                .collect(),
        }
    }

    fn compile_expr(
        &mut self,
        expr: &Expr,
        input: &str,
        output: &str,
        m: &mut PetriModule,
    ) -> Result<(), CompileError> {
        if self.depth >= self.max_depth {
            let module = self.in_progress.last().cloned().unwrap_or_default();
            return Err(CompileError::StackOverflow(module, self.max_depth));
        }
        self.depth += 1;
        let res = self.compile_node(expr, input, output, m);
        self.depth -= 1;
        res
    }

    fn compile_node(
        &mut self,
        expr: &Expr,
        input: &str,
        output: &str,
        m: &mut PetriModule,
    ) -> Result<(), CompileError> {
        match expr {
            Expr::Action { .. } => {
                let t = self.fresh("T");
                m.add_transition(&t, 0);
                m.consume(input, &t);
                m.produce(&t, output);
            }
            Expr::Sequence { children } => {
                let mut current = input.to_string();
                for (i, child) in children.iter().enumerate() {
                    let next = if i == children.len() - 1 {
                        output.to_string()
                    } else {
                        let p = self.fresh("P");
                        m.add_place(&p);
                        p
                    };
                    self.compile_expr(child, &current, &next, m)?;
                    current = next;
                }
            }
            Expr::Parallel { left, right } => {
                let left_in = self.fresh("P");
                let right_in = self.fresh("P");
                let left_out = self.fresh("P");
                let right_out = self.fresh("P");
                for p in &[&left_in, &right_in, &left_out, &right_out] {
                    m.add_place(p);
                }
                let fork = self.fresh("T");
                let join = self.fresh("T");
                m.add_transition(&fork, 0);
                m.add_transition(&join, 0);
                m.consume(input, &fork);
                m.produce(&fork, &left_in);
                m.produce(&fork, &right_in);
                self.compile_expr(left, &left_in, &left_out, m)?;
                self.compile_expr(right, &right_in, &right_out, m)?;
                m.consume(&left_out, &join);
                m.consume(&right_out, &join);
                m.produce(&join, output);
            }
            Expr::Choice { left, right } => {
                self.compile_expr(left, input, output, m)?;
                self.compile_expr(right, input, output, m)?;
            }
            Expr::Priority { level, child } => {
                let mid = self.fresh("P");
                let gate = self.fresh("T");
                m.add_place(&mid);
                m.add_transition(&gate, *level);
                m.consume(input, &gate);
                m.produce(&gate, &mid);
                self.compile_expr(child, &mid, output, m)?;
            }
            Expr::Call { module } => {
                let sub = self.generate_at(module, Some(module.loc))?;
                let sub = self.instantiate(&sub);
                m.absorb(&sub);
                let call = self.fresh("T_call");
                let ret = self.fresh("T_ret");
                m.add_transition(&call, 0);
                m.add_transition(&ret, 0);
                m.consume(input, &call);
                m.produce(&call, &sub.entry);
                m.consume(&sub.exit, &ret);
                m.produce(&ret, output);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser_wrapper::parse_str;

    fn codegen(modules: &[(&str, &str)]) -> Codegen {
        let mut cg = Codegen::new();
        for (name, src) in modules {
            cg.register(*name, parse_str(src).unwrap());
        }
        cg
    }

    fn arc(m: &PetriModule, src: &str, dst: &str) -> bool {
        m.arcs.iter().any(|a| a.src == src && a.dst == dst)
    }

    #[test]
    fn test_action() {
        let m = codegen(&[("main", "a")]).generate("main").unwrap();
        assert_eq!((m.entry.as_str(), m.exit.as_str()), ("entry0", "exit1"));
        assert_eq!(m.places.len(), 2);
        assert_eq!(m.transitions, vec![Transition { id: "T2".into(), priority: 0 }]);
        assert_eq!(
            m.arcs,
            vec![
                Arc { kind: ArcKind::PlaceToTransition, src: "entry0".into(), dst: "T2".into() },
                Arc { kind: ArcKind::TransitionToPlace, src: "T2".into(), dst: "exit1".into() },
            ]
        );
    }

    #[test]
    fn test_sequence() {
        let m = codegen(&[("main", "a.b")]).generate("main").unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.places.len(), 3);
        assert_eq!(m.transitions.len(), 2);
        let mid = &m.places[2].id;
        let (t1, t2) = (&m.transitions[0].id, &m.transitions[1].id);
        assert!(arc(&m, &m.entry, t1));
        assert!(arc(&m, t1, mid));
        assert!(arc(&m, mid, t2));
        assert!(arc(&m, t2, &m.exit));
        assert_eq!(m.arcs.len(), 4);
    }

    #[test]
    fn test_parallel() {
        let m = codegen(&[("main", "a||b")]).generate("main").unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.places.len(), 6);
        assert_eq!(m.transitions.len(), 4);
        //the fork consumes the entry and feeds both branches
        let fork = &m.arcs_from(&m.entry).next().unwrap().dst;
        assert_eq!(m.arcs_from(fork).count(), 2);
        //the join waits for both branches
        let join = &m.arcs_to(&m.exit).next().unwrap().src;
        assert_eq!(m.arcs_to(join).count(), 2);
    }

    #[test]
    fn test_choice_shares_places() {
        let mut cg = Codegen::new();
        cg.register(
            "main",
            Expr::choice(Expr::action("a"), Expr::action("b")),
        );
        let m = cg.generate("main").unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.places.len(), 2);
        assert_eq!(m.transitions.len(), 2);
        for t in &m.transitions {
            assert!(arc(&m, &m.entry, &t.id));
            assert!(arc(&m, &t.id, &m.exit));
        }
    }

    #[test]
    fn test_priority_gate() {
        let m = codegen(&[("main", "a^3")]).generate("main").unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.places.len(), 3);
        let gate = &m.arcs_from(&m.entry).next().unwrap().dst;
        assert_eq!(m.transition(gate).unwrap().priority, 3);
        let action = &m.arcs_to(&m.exit).next().unwrap().src;
        assert_eq!(m.transition(action).unwrap().priority, 0);
    }

    #[test]
    fn test_call_twice_is_disjoint() {
        let mut cg = codegen(&[("sub", "x.y"), ("main", "sub() . sub()")]);
        let m = cg.generate("main").unwrap();
        assert!(m.validate().is_ok());
        //main : entry, exit, one place between the calls, then two copies of 3 places
        assert_eq!(m.places.len(), 9);
        //two copies of 2 actions, and two call/return pairs
        assert_eq!(m.transitions.len(), 8);
        let calls: Vec<&Transition> = m
            .transitions
            .iter()
            .filter(|t| t.id.starts_with("T_call"))
            .collect();
        assert_eq!(calls.len(), 2);
        let targets: Vec<&String> = calls
            .iter()
            .map(|t| &m.arcs_from(&t.id).next().unwrap().dst)
            .collect();
        assert_ne!(targets[0], targets[1]);
        assert!(targets.iter().all(|id| id.starts_with("entry")));
    }

    #[test]
    fn test_two_callers() {
        let mut cg = codegen(&[
            ("shared", "s1 || s2"),
            ("left", "shared()"),
            ("right", "l . shared()^2"),
            ("main", "left() || right()"),
        ]);
        let m = cg.generate("main").unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.transitions.iter().filter(|t| t.priority == 2).count(), 1);
        //the callers compiled on the way are available on their own too
        let left = cg.generate("left").unwrap();
        assert!(left.validate().is_ok());
    }

    #[test]
    fn test_memo() {
        let mut cg = codegen(&[("main", "a.b")]);
        let first = cg.generate("main").unwrap();
        let counter = cg.counter;
        let second = cg.generate("main").unwrap();
        assert_eq!(first, second);
        assert_eq!(cg.counter, counter);
    }

    #[test]
    fn test_register_replaces() {
        let mut cg = codegen(&[("main", "a")]);
        let first = cg.generate("main").unwrap();
        cg.register("main", parse_str("a.b").unwrap());
        let second = cg.generate("main").unwrap();
        assert_eq!(first.transitions.len(), 1);
        assert_eq!(second.transitions.len(), 2);
    }

    #[test]
    fn test_direct_cycle() {
        let mut cg = codegen(&[("a", "x . a()")]);
        match cg.generate("a") {
            Err(CompileError::CyclicModuleCall(Some(_), cycle)) => {
                assert_eq!(cycle, vec!["a".to_string(), "a".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_indirect_cycle_leaves_memo_clean() {
        let mut cg = codegen(&[("a", "b()"), ("b", "x || a()"), ("c", "ok")]);
        let err = cg.generate("a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cyclic module reference: a -> b -> a"
        );
        assert!(cg.generated.is_empty());
        assert!(cg.in_progress.is_empty());
        assert_eq!(cg.depth, 0);
        assert!(cg.generate("c").is_ok());
        //breaking the cycle makes both modules compile
        cg.register("b", parse_str("x").unwrap());
        assert!(cg.generate("a").is_ok());
    }

    #[test]
    fn test_unknown_module() {
        let mut cg = codegen(&[("main", "a . ghost()")]);
        assert_eq!(
            cg.generate("main"),
            Err(CompileError::UnknownModule(Some((0, 4, 9)), "ghost".to_string()))
        );
        assert!(!cg.generated.contains_key("main"));
        assert_eq!(
            cg.generate("nope"),
            Err(CompileError::UnknownModule(None, "nope".to_string()))
        );
        assert_eq!(
            cg.check_calls(),
            Err(CompileError::UnknownModule(Some((0, 4, 9)), "ghost".to_string()))
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut expr = Expr::action("a");
        for _ in 0..10 {
            expr = Expr::priority(1, expr);
        }
        let mut cg = Codegen::with_max_depth(5);
        cg.register("deep", expr.clone());
        assert_eq!(
            cg.generate("deep"),
            Err(CompileError::StackOverflow("deep".to_string(), 5))
        );
        let mut cg = Codegen::with_max_depth(11);
        cg.register("deep", expr);
        assert!(cg.generate("deep").is_ok());
    }

    #[test]
    fn test_depth_counts_calls() {
        let mut cg = Codegen::with_max_depth(4);
        cg.register("m0", Expr::action("a"));
        for i in 1..6 {
            cg.register(format!("m{}", i), Expr::call(&format!("m{}", i - 1)));
        }
        assert!(matches!(
            cg.generate("m5"),
            Err(CompileError::StackOverflow(_, 4))
        ));
        assert!(cg.generate("m2").is_ok());
    }

    #[test]
    fn test_deepest_parsed_tree_compiles() {
        use crate::frontend::parser_wrapper::MAX_NESTING;
        let chain = vec!["a"; MAX_NESTING].join(".");
        let nested = format!(
            "{}a^1{}",
            "[".repeat(MAX_NESTING),
            "]".repeat(MAX_NESTING)
        );
        let mut cg = codegen(&[("chain", chain.as_str()), ("nested", nested.as_str())]);
        let m = cg.generate("chain").unwrap();
        assert_eq!(m.transitions.len(), MAX_NESTING);
        assert!(cg.generate("nested").is_ok());
    }

    #[test]
    fn test_deep_module_inside_call_overflows() {
        let chain = vec!["a"; REC_DEPTH].join(".");
        let mut cg = codegen(&[("chain", chain.as_str()), ("outer", "b.chain()")]);
        assert!(cg.generate("chain").is_ok());
        let mut cg = codegen(&[("chain", chain.as_str()), ("outer", "b.chain()")]);
        assert_eq!(
            cg.generate("outer"),
            Err(CompileError::StackOverflow("chain".to_string(), REC_DEPTH))
        );
    }

    #[test]
    fn test_unique_ids_across_session() {
        let mut cg = codegen(&[("a", "x.y"), ("b", "a() || a()")]);
        let a = cg.generate("a").unwrap();
        let b = cg.generate("b").unwrap();
        let mut merged = b.clone();
        merged.absorb(&a);
        assert!(merged.validate().is_ok());
    }
}
