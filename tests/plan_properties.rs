//! Property tests for dependency planning over random acyclic registries

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use trun::error::ResolveError;
use trun::runner::{plan, DependencyGraph, Registry, TaskRecord};

fn task_name(i: usize) -> String {
    format!("task_{}", i)
}

// Acyclic by construction: task N may only depend on tasks 0..N-1.
// Duplicate dependency entries are kept on purpose.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), num_tasks)
            .prop_map(|raw_deps| {
                raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        if i == 0 {
                            Vec::new()
                        } else {
                            deps.into_iter().map(|d| d % i).collect()
                        }
                    })
                    .collect()
            })
    })
}

fn registry_from(deps: &[Vec<usize>]) -> Registry {
    Registry::from_records(deps.iter().enumerate().map(|(i, d)| {
        TaskRecord::new(
            task_name(i),
            d.iter().map(|&j| task_name(j)),
            format!("echo {}", i),
        )
    }))
    .unwrap()
}

fn reachable(deps: &[Vec<usize>], roots: &[usize]) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(i) = stack.pop() {
        if seen.insert(task_name(i)) {
            stack.extend(deps[i].iter().copied());
        }
    }
    seen
}

fn roots_strategy() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(any::<usize>(), 1..4)
}

proptest! {
    #[test]
    fn every_reachable_task_is_planned_exactly_once(
        deps in dag_strategy(12),
        raw_roots in roots_strategy(),
    ) {
        let roots: Vec<usize> = raw_roots.iter().map(|r| r % deps.len()).collect();
        let root_names: Vec<String> = roots.iter().map(|&r| task_name(r)).collect();

        let registry = registry_from(&deps);
        let graph = DependencyGraph::build(&registry).unwrap();
        let plan = plan(&graph, &root_names).unwrap();

        let names = plan.task_names();
        let unique: HashSet<&str> = names.iter().copied().collect();
        prop_assert_eq!(unique.len(), names.len());

        let expected = reachable(&deps, &roots);
        let planned: HashSet<String> = names.iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(planned, expected);
    }

    #[test]
    fn dependencies_are_placed_before_dependents(
        deps in dag_strategy(12),
        raw_roots in roots_strategy(),
    ) {
        let root_names: Vec<String> = raw_roots.iter().map(|r| task_name(r % deps.len())).collect();

        let registry = registry_from(&deps);
        let graph = DependencyGraph::build(&registry).unwrap();
        let plan = plan(&graph, &root_names).unwrap();

        let position: HashMap<&str, usize> = plan
            .task_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        for entry in plan.iter() {
            let at = position[entry.task.as_str()];
            for dep in graph.dependencies_of(&entry.task) {
                prop_assert!(position[dep] < at, "{} placed after {}", dep, entry.task);
            }
        }
    }

    #[test]
    fn planning_is_deterministic(
        deps in dag_strategy(12),
        raw_roots in roots_strategy(),
    ) {
        let root_names: Vec<String> = raw_roots.iter().map(|r| task_name(r % deps.len())).collect();

        let first = registry_from(&deps);
        let second = registry_from(&deps);
        let plan_a = plan(&DependencyGraph::build(&first).unwrap(), &root_names).unwrap();
        let plan_b = plan(&DependencyGraph::build(&second).unwrap(), &root_names).unwrap();

        prop_assert_eq!(plan_a, plan_b);
    }

    #[test]
    fn requested_tasks_are_marked_root(
        deps in dag_strategy(12),
        raw_roots in roots_strategy(),
    ) {
        let root_names: HashSet<String> = raw_roots.iter().map(|r| task_name(r % deps.len())).collect();
        let request: Vec<String> = raw_roots.iter().map(|r| task_name(r % deps.len())).collect();

        let registry = registry_from(&deps);
        let graph = DependencyGraph::build(&registry).unwrap();
        let plan = plan(&graph, &request).unwrap();

        for entry in plan.iter() {
            prop_assert_eq!(entry.is_root, root_names.contains(&entry.task));
        }
    }

    #[test]
    fn closing_a_path_into_a_cycle_is_detected(deps in dag_strategy(8)) {
        prop_assume!(deps.len() > 1);
        let last = deps.len() - 1;

        // Task 0 now depends on the last task, which reaches 0 only if a path exists.
        let mut cyclic = deps.clone();
        cyclic[0].push(last);
        let registry = registry_from(&cyclic);

        let closes_cycle = reachable(&deps, &[last]).contains(&task_name(0));
        match DependencyGraph::build(&registry) {
            Err(ResolveError::CyclicDependency(path)) => {
                prop_assert!(closes_cycle);
                prop_assert_eq!(path.first(), path.last());
            }
            Ok(_) => prop_assert!(!closes_cycle),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
