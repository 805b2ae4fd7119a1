// ABOUTME: Dependency sort for the pass snapshot.
// ABOUTME: Stable topological order with cycle detection; link targets come first.

use std::collections::HashMap;

use thiserror::Error;

use super::container::Container;
use crate::types::ContainerName;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("circular container dependency: {}", format_cycle(.0))]
    Cycle(Vec<ContainerName>),
}

fn format_cycle(names: &[ContainerName]) -> String {
    names
        .iter()
        .map(ContainerName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Sort containers so every container appears after its link targets.
///
/// Containers without ordering constraints between them keep their original
/// relative order. Link targets missing from the snapshot are ignored. A
/// dependency cycle aborts the sort.
pub fn sort_by_dependencies(containers: Vec<Container>) -> Result<Vec<Container>, SortError> {
    let index: HashMap<&str, usize> = containers
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; containers.len()];
    let mut order = Vec::with_capacity(containers.len());
    let mut stack = Vec::new();

    for i in 0..containers.len() {
        visit(i, &containers, &index, &mut marks, &mut order, &mut stack)?;
    }

    let mut slots: Vec<Option<Container>> = containers.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|i| slots[i].take().expect("sort emits each index exactly once"))
        .collect())
}

fn visit(
    idx: usize,
    containers: &[Container],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    stack: &mut Vec<usize>,
) -> Result<(), SortError> {
    match marks[idx] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = stack.iter().position(|&i| i == idx).unwrap_or(0);
            let mut cycle: Vec<ContainerName> = stack[start..]
                .iter()
                .map(|&i| containers[i].name.clone())
                .collect();
            cycle.push(containers[idx].name.clone());
            return Err(SortError::Cycle(cycle));
        }
        Mark::Unvisited => {}
    }

    marks[idx] = Mark::InProgress;
    stack.push(idx);

    for link in &containers[idx].links {
        if let Some(&target) = index.get(link.as_str()) {
            visit(target, containers, index, marks, order, stack)?;
        }
    }

    stack.pop();
    marks[idx] = Mark::Done;
    order.push(idx);
    Ok(())
}
