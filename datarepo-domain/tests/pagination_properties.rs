use anyhow::Result as AnyResult;
use datarepo_domain::paging::{Direction, PageRequest, Sort};
use datarepo_domain::persist::{DataSource, InMemoryDataSource, paginator};
use datarepo_domain::query::{Clause, Operand, Predicate};
use datarepo_domain::specification::MatchAll;
use datarepo_macros::entity;

#[entity]
struct Row {
    rank: i32,
    label: Option<String>,
}

async fn seeded(n: i32) -> AnyResult<InMemoryDataSource<Row>> {
    let source = InMemoryDataSource::new();
    for rank in 0..n {
        source
            .insert(Row {
                id: None,
                rank: rank % 4,
                label: (rank % 3 != 0).then(|| format!("row{rank}")),
            })
            .await?;
    }
    Ok(source)
}

#[tokio::test]
async fn pages_cover_every_row_exactly_once() -> AnyResult<()> {
    for n in [0, 1, 2, 5, 9, 12, 23] {
        let source = seeded(n).await?;
        for size in 1..=7u64 {
            let sort = paginator::ordering(
                Some(&Sort::by(Direction::Desc, ["rank"])),
                &Sort::unsorted(),
            );
            let expected_pages = (n as u64).div_ceil(size);

            let mut seen: Vec<i64> = Vec::new();
            let mut request = PageRequest::of(0, size)?;
            loop {
                let page = paginator::page(&source, &MatchAll, &MatchAll, &sort, &request).await?;
                assert_eq!(page.total_elements(), n as u64, "n={n} size={size}");
                assert_eq!(page.total_pages(), expected_pages, "n={n} size={size}");
                assert!(page.content().len() as u64 <= size);
                seen.extend(page.content().iter().filter_map(|r| r.id));
                match page.next_request() {
                    Some(next) => request = next,
                    None => break,
                }
            }
            assert_eq!(seen.len(), n as usize, "n={n} size={size}");
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), n as usize, "rows repeated across pages");
        }
    }
    Ok(())
}

#[tokio::test]
async fn page_past_the_end_is_empty_with_exact_total() -> AnyResult<()> {
    let source = seeded(5).await?;
    let sort = paginator::ordering(None, &Sort::unsorted());
    let request = PageRequest::of(4, 2)?;
    let page = paginator::page(&source, &MatchAll, &MatchAll, &sort, &request).await?;
    assert!(!page.has_content());
    assert_eq!(page.total_elements(), 5);
    assert!(!page.has_next());
    assert!(page.has_previous());
    Ok(())
}

#[tokio::test]
async fn count_is_skipped_only_when_inferable() -> AnyResult<()> {
    let source = seeded(5).await?;
    let sort = paginator::ordering(None, &Sort::unsorted());

    source.reset_stats();
    paginator::page(&source, &MatchAll, &MatchAll, &sort, &PageRequest::of(0, 10)?).await?;
    assert_eq!(source.stats().counts, 0);

    paginator::page(&source, &MatchAll, &MatchAll, &sort, &PageRequest::of(1, 3)?).await?;
    assert_eq!(source.stats().counts, 0);

    paginator::page(&source, &MatchAll, &MatchAll, &sort, &PageRequest::of(0, 3)?).await?;
    assert_eq!(source.stats().counts, 1);
    Ok(())
}

#[tokio::test]
async fn count_predicate_may_differ_from_content_predicate() -> AnyResult<()> {
    let source = seeded(8).await?;
    let sort = paginator::ordering(None, &Sort::unsorted());
    let top_rank = Predicate::from_clauses(&[Clause::eq("rank", Operand::literal(3))])?;

    // 内容只取 rank = 3，总数按全部行计算
    let request = PageRequest::of(0, 1)?;
    let page = paginator::page(&source, &top_rank, &MatchAll, &sort, &request).await?;
    assert_eq!(page.content().len(), 1);
    assert_eq!(page.total_elements(), 8);
    Ok(())
}

#[tokio::test]
async fn nulls_sort_first_ascending_and_last_descending() -> AnyResult<()> {
    let source = seeded(6).await?;
    let asc = paginator::ordering(Some(&Sort::by(Direction::Asc, ["label"])), &Sort::unsorted());
    let rows = source.select(&MatchAll, &asc, Default::default()).await?;
    assert!(rows[0].label.is_none());
    assert!(rows[5].label.is_some());

    let desc = paginator::ordering(Some(&Sort::by(Direction::Desc, ["label"])), &Sort::unsorted());
    let rows = source.select(&MatchAll, &desc, Default::default()).await?;
    assert!(rows[0].label.is_some());
    assert!(rows[5].label.is_none());
    Ok(())
}

#[tokio::test]
async fn slice_reads_one_row_ahead() -> AnyResult<()> {
    let source = seeded(6).await?;
    let sort = paginator::ordering(None, &Sort::unsorted());

    let first = paginator::slice(&source, &MatchAll, &sort, &PageRequest::of(0, 3)?).await?;
    assert_eq!(first.content().len(), 3);
    assert!(first.has_next());

    let second = paginator::slice(&source, &MatchAll, &sort, &PageRequest::of(1, 3)?).await?;
    assert_eq!(second.content().len(), 3);
    assert!(!second.has_next());
    assert_eq!(source.stats().counts, 0);
    Ok(())
}
