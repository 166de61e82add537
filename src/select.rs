// src/select.rs
//! Diversity-constrained top-k selection: a guarantee pass that seats
//! every topic before volume-favored topics saturate the batch, then a
//! greedy fill with an escalating per-topic penalty.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::score::ScoredRow;

#[derive(Debug, Clone, Copy)]
pub struct SelectParams {
    pub batch_size: usize,
    pub min_per_topic: usize,
    pub max_per_topic: usize,
    /// Penalty subtracted per item already selected from a topic during
    /// the greedy fill.
    pub topic_penalty: f64,
}

impl Default for SelectParams {
    fn default() -> Self {
        Self {
            batch_size: 12,
            min_per_topic: 1,
            max_per_topic: 4,
            topic_penalty: 1.5,
        }
    }
}

/// Within-topic ordering: total score descending with a deterministic
/// tie-break chain ending at the title.
fn row_cmp(a: &ScoredRow, b: &ScoredRow) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then(b.quality.total_cmp(&a.quality))
        .then(b.relevance.cmp(&a.relevance))
        .then(b.priority_boost.total_cmp(&a.priority_boost))
        .then(b.preference.total_cmp(&a.preference))
        .then(b.published_at().cmp(&a.published_at()))
        .then(a.item.title.cmp(&b.item.title))
}

struct TopicQueue {
    topic: String,
    rows: Vec<ScoredRow>,
    next: usize,
    taken: usize,
}

impl TopicQueue {
    fn front(&self) -> Option<&ScoredRow> {
        self.rows.get(self.next)
    }

    fn take(&mut self) -> ScoredRow {
        let row = self.rows[self.next].clone();
        self.next += 1;
        self.taken += 1;
        row
    }
}

/// Select the final bounded batch. Output order is selection order, not
/// display order; callers regroup by topic afterward.
pub fn select_diverse(rows: Vec<ScoredRow>, p: &SelectParams) -> Vec<ScoredRow> {
    if p.batch_size == 0 || p.max_per_topic == 0 || rows.is_empty() {
        return Vec::new();
    }

    // Partition into per-topic queues, pre-sorted. BTreeMap keeps topic
    // iteration deterministic.
    let mut by_topic: BTreeMap<String, Vec<ScoredRow>> = BTreeMap::new();
    for row in rows {
        by_topic.entry(row.topic.clone()).or_default().push(row);
    }
    let mut queues: Vec<TopicQueue> = by_topic
        .into_iter()
        .map(|(topic, mut rows)| {
            rows.sort_by(row_cmp);
            TopicQueue {
                topic,
                rows,
                next: 0,
                taken: 0,
            }
        })
        .collect();

    let mut selected = Vec::with_capacity(p.batch_size);

    // Guarantee pass: up to min_per_topic rounds; within a round, topics
    // are visited by their current front score.
    for _round in 0..p.min_per_topic {
        if selected.len() >= p.batch_size {
            break;
        }
        let mut order: Vec<usize> = (0..queues.len())
            .filter(|&i| queues[i].front().is_some() && queues[i].taken < p.max_per_topic)
            .collect();
        if order.is_empty() {
            break;
        }
        order.sort_by(|&ia, &ib| {
            let a = queues[ia].front().unwrap();
            let b = queues[ib].front().unwrap();
            b.total
                .total_cmp(&a.total)
                .then(b.quality.total_cmp(&a.quality))
                .then(queues[ia].topic.cmp(&queues[ib].topic))
        });
        for i in order {
            if selected.len() >= p.batch_size {
                break;
            }
            selected.push(queues[i].take());
        }
    }

    // Greedy fill: best next item across topics under their cap, judged
    // by total minus the escalating penalty for already-seated topics.
    while selected.len() < p.batch_size {
        let mut best: Option<usize> = None;
        for i in 0..queues.len() {
            if queues[i].taken >= p.max_per_topic {
                continue;
            }
            let Some(candidate) = queues[i].front() else {
                continue;
            };
            let effective = candidate.total - p.topic_penalty * queues[i].taken as f64;
            let better = match best {
                None => true,
                Some(j) => {
                    let incumbent = queues[j].front().unwrap();
                    let inc_eff = incumbent.total - p.topic_penalty * queues[j].taken as f64;
                    match effective.total_cmp(&inc_eff) {
                        Ordering::Greater => true,
                        Ordering::Less => false,
                        Ordering::Equal => match candidate.total.total_cmp(&incumbent.total) {
                            Ordering::Greater => true,
                            Ordering::Less => false,
                            Ordering::Equal => {
                                match candidate.quality.total_cmp(&incumbent.quality) {
                                    Ordering::Greater => true,
                                    Ordering::Less => false,
                                    Ordering::Equal => queues[i].topic < queues[j].topic,
                                }
                            }
                        },
                    }
                }
            };
            if better {
                best = Some(i);
            }
        }
        match best {
            Some(i) => selected.push(queues[i].take()),
            None => break,
        }
    }

    selected
}
