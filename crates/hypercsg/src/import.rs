//! Plain-text boundary format.
//!
//! ```text
//! # unit square
//! 4 0-cells:
//!   0 0
//!   1 0
//!   1 1
//!   0 1
//! 4 1-cells:
//!   -0 +1
//!   -1 +2
//!   -2 +3
//!   -3 +0
//! 1 2-cells:
//!   !0 !1 !2 !3
//! ```
//!
//! Each section lists cells of one rank, starting from vertices. Vertices are
//! coordinate rows and higher cells are lists of facets of the previous rank.
//! A facet reference is `+i` or `-i` for an explicit sign, or `!i` to let the
//! importer decide. The last section must contain exactly one cell, which is
//! the imported polytope.

use std::collections::HashMap;
use std::fmt::Write;

use eyre::{OptionExt, bail};
use hypercsg_math::prelude::*;
use itertools::Itertools;
use nom::Parser;
use nom::bytes::complete::tag;
use nom::character::complete::{multispace1, one_of, u8, u32};
use nom::combinator::all_consuming;
use nom::error::Error;
use nom::multi::separated_list1;
use nom::number::complete::double;
use nom::sequence::terminated;

use crate::orient::{finish, is_oriented_shallow};
use crate::{
    HyperplaneData, HyperplaneId, HyperplaneSet, PolytopeData, PolytopeId, SignedPolytope, Space,
};

/// Error importing a polytope, with the 1-based line number where it was
/// detected.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ImportError {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub kind: ImportErrorKind,
}

/// Kind of [`ImportError`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ImportErrorKind {
    #[error("input contains no cells")]
    Empty,
    #[error("expected a header like `<count> {0}-cells:`")]
    MissingHeader(u8),
    #[error("expected {expected}-cells but found {found}-cells")]
    WrongRank { expected: u8, found: u8 },
    #[error("invalid syntax: {0:?}")]
    Syntax(String),
    #[error("header declares {expected} {rank}-cells but {found} were listed")]
    CountMismatch {
        rank: u8,
        expected: usize,
        found: usize,
    },
    #[error("facet index {index} is out of range for {count} {rank}-cells")]
    IndexOutOfRange { rank: u8, index: usize, count: usize },
    #[error("vertex has {found} coordinates but the first vertex has {expected}")]
    ArityMismatch { expected: u8, found: u8 },
    #[error("{0} top-level cells were declared instead of 1")]
    MultipleTopCells(usize),
    #[error("top-level cell has rank {rank} but vertices have {ndim} coordinates")]
    RankMismatch { rank: u8, ndim: u8 },
    #[error("{0}-cell does not have a closed boundary")]
    NotClosed(u8),
    #[error("{0}-cell has inconsistent facet signs")]
    Unoriented(u8),
    #[error("facet of the top-level cell is not flat")]
    NotFlat,
    #[error("vertex {vertex} lies on {count} facet hyperplanes; at most {ndim} are supported")]
    TooManyHyperplanesAtVertex {
        vertex: usize,
        count: usize,
        ndim: u8,
    },
    #[error("vertex {vertex} lies on only {count} facet hyperplanes")]
    TooFewHyperplanesAtVertex { vertex: usize, count: usize },
    #[error("{rank}-cell lies on {found} facet hyperplanes instead of {expected}")]
    WrongHyperplaneCount {
        rank: u8,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    IndexOverflow(#[from] IndexOverflow),
}

impl ImportErrorKind {
    fn at(self, line: usize) -> ImportError {
        ImportError { line, kind: self }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FacetSign {
    Explicit(Sign),
    Unknown,
}

#[derive(Debug, Clone)]
struct Cell {
    line: usize,
    facets: Vec<(FacetSign, usize)>,
}
impl Cell {
    fn has_explicit_signs(&self) -> bool {
        self.facets.iter().all(|(s, _)| *s != FacetSign::Unknown)
    }
}

#[derive(Debug)]
struct Section {
    line: usize,
    rank: u8,
    count: usize,
}

#[derive(Debug, Default)]
struct ParsedFile {
    verts: Vec<Vector>,
    /// Line of each vertex.
    vert_lines: Vec<usize>,
    /// Cells of rank 1 and up, indexed by `rank - 1`.
    cells: Vec<Vec<Cell>>,
    /// Line of the header of the last section.
    top_line: usize,
}
impl ParsedFile {
    fn count(&self, rank: u8) -> usize {
        match rank {
            0 => self.verts.len(),
            r => self.cells.get(r as usize - 1).map_or(0, |c| c.len()),
        }
    }

    fn parse(text: &str) -> Result<Self, ImportError> {
        let mut ret = Self::default();
        let mut ndim = None;
        let mut current: Option<Section> = None;
        let mut current_rank: Option<u8> = None;

        for (i, line) in text.lines().enumerate() {
            let line_number = i + 1;
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Ok((_, (count, rank))) = all_consuming(header()).parse_complete(line) {
                if let Some(section) = current.take() {
                    ret.check_count(&section)?;
                }
                let expected = match current_rank {
                    None => 0,
                    Some(r) => r + 1,
                };
                if rank != expected {
                    let kind = ImportErrorKind::WrongRank { expected, found: rank };
                    return Err(kind.at(line_number));
                }
                if rank > 0 {
                    ret.cells.push(vec![]);
                }
                ret.top_line = line_number;
                current_rank = Some(rank);
                current = Some(Section {
                    line: line_number,
                    rank,
                    count: count as usize,
                });
                continue;
            }

            let section = current.as_ref().ok_or_else(|| {
                let rank = ret.cells.len() as u8;
                ImportErrorKind::MissingHeader(rank).at(line_number)
            })?;
            let syntax_error = || ImportErrorKind::Syntax(line.to_owned()).at(line_number);

            if section.rank == 0 {
                let (_, coords) = all_consuming(coordinates())
                    .parse_complete(line)
                    .map_err(|_| syntax_error())?;
                let found = coords.len() as u8;
                let expected = *ndim.get_or_insert(found);
                if found != expected {
                    return Err(ImportErrorKind::ArityMismatch { expected, found }.at(line_number));
                }
                ret.verts.push(coords.into_iter().collect());
                ret.vert_lines.push(line_number);
            } else {
                let (_, facets) = all_consuming(facet_refs())
                    .parse_complete(line)
                    .map_err(|_| syntax_error())?;
                let facet_rank = section.rank - 1;
                let count = ret.count(facet_rank);
                let facets = facets
                    .into_iter()
                    .map(|(c, index)| {
                        let index = index as usize;
                        if index >= count {
                            let kind = ImportErrorKind::IndexOutOfRange {
                                rank: facet_rank,
                                index,
                                count,
                            };
                            return Err(kind.at(line_number));
                        }
                        let sign = match c {
                            '+' => FacetSign::Explicit(Sign::Pos),
                            '-' => FacetSign::Explicit(Sign::Neg),
                            _ => FacetSign::Unknown,
                        };
                        Ok((sign, index))
                    })
                    .try_collect()?;
                let cell = Cell {
                    line: line_number,
                    facets,
                };
                if let Some(cells) = ret.cells.last_mut() {
                    cells.push(cell);
                }
            }
        }

        match current {
            Some(section) => ret.check_count(&section)?,
            None => return Err(ImportErrorKind::Empty.at(text.lines().count().max(1))),
        }
        Ok(ret)
    }

    fn check_count(&self, section: &Section) -> Result<(), ImportError> {
        let found = self.count(section.rank);
        if found != section.count {
            return Err(ImportErrorKind::CountMismatch {
                rank: section.rank,
                expected: section.count,
                found,
            }
            .at(section.line));
        }
        Ok(())
    }
}

fn header<'a>() -> impl Parser<&'a str, Output = (u32, u8), Error = Error<&'a str>> {
    (terminated(u32, multispace1), terminated(u8, tag("-cells:")))
}

fn coordinates<'a>() -> impl Parser<&'a str, Output = Vec<f64>, Error = Error<&'a str>> {
    separated_list1(multispace1, double)
}

fn facet_refs<'a>() -> impl Parser<&'a str, Output = Vec<(char, u32)>, Error = Error<&'a str>> {
    separated_list1(multispace1, (one_of("+-!"), u32))
}

/// Imports a polytope from the plain-text boundary format.
///
/// Hyperplanes are fitted through the vertices of each facet of the
/// top-level cell and shared by the lower-rank cells they contain. Cells
/// whose facets all have explicit signs must already be consistently
/// oriented. The result is fully oriented.
#[tracing::instrument(skip_all)]
pub fn import_polytope(space: &mut Space, text: &str) -> Result<SignedPolytope, ImportError> {
    let file = ParsedFile::parse(text)?;
    let top_line = file.top_line;

    let ndim = file.verts.first().map_or(0, |v| v.ndim());
    let top_rank = file.cells.len() as u8;
    if top_rank != ndim || ndim == 0 {
        return Err(ImportErrorKind::RankMismatch { rank: top_rank, ndim }.at(top_line));
    }
    if ndim > MAX_NDIM {
        return Err(ImportErrorKind::RankMismatch { rank: top_rank, ndim }.at(top_line));
    }
    let top_count = file.count(top_rank);
    if top_count != 1 {
        return Err(ImportErrorKind::MultipleTopCells(top_count).at(top_line));
    }

    check_closed(&file)?;

    // Vertex indices of each cell, indexed by `rank - 1`.
    let mut vertex_sets: Vec<Vec<Vec<usize>>> = vec![];
    for (i, cells) in file.cells.iter().enumerate() {
        let sets = cells
            .iter()
            .map(|cell| {
                cell.facets
                    .iter()
                    .flat_map(|&(_, f)| match i {
                        0 => vec![f],
                        _ => vertex_sets[i - 1][f].clone(),
                    })
                    .sorted_unstable()
                    .dedup()
                    .collect_vec()
            })
            .collect_vec();
        vertex_sets.push(sets);
    }

    let watermark = space.next_polytope_id();
    let eps = space.params().vertex_epsilon;

    // Fit a hyperplane to each facet of the top-level cell, oriented away
    // from the centroid of the whole polytope.
    let all_verts = &file.verts;
    let centroid = all_verts.iter().sum::<Vector>() / all_verts.len() as Float;
    let facet_rank = ndim - 1;
    let mut fitted: Vec<(HyperplaneData, HyperplaneId)> = vec![];
    let mut planes: Vec<Vec<HyperplaneSet>> = (0..ndim)
        .map(|rank| vec![HyperplaneSet::new(); file.count(rank)])
        .collect();
    let facet_vertices = facet_vertex_sets(&file, &vertex_sets, facet_rank);
    for (i, vertex_indices) in facet_vertices.iter().enumerate() {
        let points = vertex_indices.iter().map(|&v| file.verts[v].clone()).collect_vec();
        let line = match facet_rank {
            0 => top_line,
            r => file.cells[r as usize - 1][i].line,
        };
        let mut plane =
            fit_hyperplane(&points, ndim, eps).ok_or(ImportErrorKind::NotFlat.at(line))?;
        if plane.signed_distance(&centroid) > 0.0 {
            plane = plane.flip();
        }
        let existing = fitted.iter().find(|(p, _)| {
            p.normal.approx_eq(&plane.normal, eps) && (p.offset - plane.offset).abs() <= eps
        });
        let h = match existing {
            Some(&(_, h)) => h,
            None => {
                let h = space
                    .add_hyperplane(plane.clone())
                    .map_err(|e| ImportErrorKind::from(e).at(line))?;
                fitted.push((plane, h));
                h
            }
        };
        planes[facet_rank as usize][i].push(h);
    }

    // Propagate hyperplanes down to lower-rank cells.
    for rank in (1..ndim).rev() {
        for (i, cell) in file.cells[rank as usize - 1].iter().enumerate() {
            let inherited = planes[rank as usize][i].clone();
            for &(_, f) in &cell.facets {
                planes[rank as usize - 1][f].extend(inherited.iter().copied());
            }
        }
    }
    // Every cell must lie on exactly as many hyperplanes as its codimension.
    // Anything else cannot be intersected reliably.
    for (rank, sets) in planes.iter_mut().enumerate() {
        for (i, set) in sets.iter_mut().enumerate() {
            set.sort_unstable();
            set.dedup();
            let expected = ndim as usize - rank;
            let count = set.len();
            if count == expected {
                continue;
            }
            tracing::warn!(
                rank,
                count,
                expected,
                "imported cell lies on an unexpected number of hyperplanes",
            );
            let (line, kind) = match rank {
                0 if count > expected => (
                    file.vert_lines[i],
                    ImportErrorKind::TooManyHyperplanesAtVertex { vertex: i, count, ndim },
                ),
                0 => (
                    file.vert_lines[i],
                    ImportErrorKind::TooFewHyperplanesAtVertex { vertex: i, count },
                ),
                r => (
                    file.cells[r - 1][i].line,
                    ImportErrorKind::WrongHyperplaneCount {
                        rank: r as u8,
                        expected,
                        found: count,
                    },
                ),
            };
            return Err(kind.at(line));
        }
    }

    // Build polytopes from the bottom up.
    let overflow = |e: IndexOverflow| ImportErrorKind::from(e).at(top_line);
    let mut ids: Vec<Vec<PolytopeId>> = vec![];
    let mut vertex_ids = vec![];
    for (v, coords) in file.verts.iter().enumerate() {
        let id = space
            .add_vertex(ndim, Some(coords.clone()), planes[0][v].clone())
            .map_err(overflow)?;
        vertex_ids.push(id);
    }
    ids.push(vertex_ids);
    for (i, cells) in file.cells.iter().enumerate() {
        let rank = i as u8 + 1;
        let mut rank_ids = vec![];
        for (j, cell) in cells.iter().enumerate() {
            let facets = cell
                .facets
                .iter()
                .map(|&(sign, f)| {
                    let sign = match sign {
                        FacetSign::Explicit(s) => s,
                        FacetSign::Unknown => Sign::Pos,
                    };
                    SignedPolytope::new(ids[i][f], sign, 0)
                })
                .collect();
            let hyperplanes = planes.get(rank as usize).map(|p| p[j].clone()).unwrap_or_default();
            let id = space
                .add_polytope(PolytopeData::new(rank, ndim, facets, hyperplanes))
                .map_err(overflow)?;
            rank_ids.push(id);
        }
        ids.push(rank_ids);
    }

    // Cells with fully explicit signs must be consistent.
    for (i, cells) in file.cells.iter().enumerate() {
        for (j, cell) in cells.iter().enumerate() {
            let facets_explicit = i == 0
                || cell
                    .facets
                    .iter()
                    .all(|&(_, f)| file.cells[i - 1][f].has_explicit_signs());
            if cell.has_explicit_signs()
                && facets_explicit
                && !is_oriented_shallow(space, ids[i + 1][j])
            {
                return Err(ImportErrorKind::Unoriented(i as u8 + 1).at(cell.line));
            }
        }
    }

    let top = SignedPolytope::from(ids[ndim as usize][0]);
    let ret = finish(space, top, watermark);
    tracing::debug!(counts = ?space.element_counts(ret.id), "imported polytope");
    Ok(ret)
}

fn facet_vertex_sets(
    file: &ParsedFile,
    vertex_sets: &[Vec<Vec<usize>>],
    rank: u8,
) -> Vec<Vec<usize>> {
    match rank {
        0 => (0..file.verts.len()).map(|v| vec![v]).collect(),
        r => vertex_sets[r as usize - 1].clone(),
    }
}

/// Checks that every edge has an even number of vertices and that every ridge
/// of every higher cell is shared by exactly two of its facets.
fn check_closed(file: &ParsedFile) -> Result<(), ImportError> {
    for (i, cells) in file.cells.iter().enumerate() {
        let rank = i as u8 + 1;
        for cell in cells {
            let closed = match i {
                0 => !cell.facets.is_empty() && cell.facets.len() % 2 == 0,
                _ => {
                    let mut ridge_counts: HashMap<usize, usize> = HashMap::new();
                    for &(_, f) in &cell.facets {
                        for &(_, r) in &file.cells[i - 1][f].facets {
                            *ridge_counts.entry(r).or_default() += 1;
                        }
                    }
                    !cell.facets.is_empty() && ridge_counts.values().all(|&n| n == 2)
                }
            };
            if !closed {
                return Err(ImportErrorKind::NotClosed(rank).at(cell.line));
            }
        }
    }
    Ok(())
}

/// Returns the hyperplane through a set of points, or `None` if they are
/// affinely dependent or do not all lie on one hyperplane.
fn fit_hyperplane(points: &[Vector], ndim: u8, eps: Float) -> Option<HyperplaneData> {
    let (origin, rest) = points.split_first()?;
    let mut spanning = vec![origin.clone()];
    let mut edges: Vec<Vector> = vec![];
    for p in rest {
        if edges.len() + 1 >= ndim as usize {
            break;
        }
        edges.push(p - origin);
        if gram_determinant(&edges) <= eps {
            edges.pop();
        } else {
            spanning.push(p.clone());
        }
    }
    if spanning.len() != ndim as usize {
        return None;
    }
    let plane = HyperplaneData::from_spanning_points(spanning, ndim)?;
    points
        .iter()
        .all(|p| plane.signed_distance(p).abs() <= eps)
        .then_some(plane)
}

/// Writes a polytope in the plain-text boundary format.
pub fn export_polytope(space: &Space, p: SignedPolytope) -> eyre::Result<String> {
    if p.initial_density != 0 {
        bail!("cannot export unbounded polytope {p}");
    }
    let elements = space.all_elements(p.id);
    let index_of = |rank: usize, id: PolytopeId| elements[rank].binary_search(&id).ok();

    let mut out = String::new();
    for (rank, ids) in elements.iter().enumerate() {
        writeln!(out, "{} {rank}-cells:", ids.len())?;
        for &id in ids {
            let line = if rank == 0 {
                let coords = space.coords(id).ok_or_eyre("vertex has no coordinates")?;
                coords.iter().join(" ")
            } else {
                let sign = if id == p.id { p.sign } else { Sign::Pos };
                space[id]
                    .facets
                    .iter()
                    .map(|f| {
                        let index = index_of(rank - 1, f.id).ok_or_eyre("facet not found")?;
                        Ok(format!("{}{index}", f.sign * sign))
                    })
                    .collect::<eyre::Result<Vec<_>>>()?
                    .join(" ")
            };
            writeln!(out, "  {line}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use hypercsg_math::assert_approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::orient::is_oriented_deep;
    use crate::primitives::make_hypercube;
    use crate::simplicial::volume;

    const SQUARE: &str = "
        # unit square
        4 0-cells:
          0 0
          1 0
          1 1
          0 1
        4 1-cells:
          -0 +1
          -1 +2
          -2 +3
          -3 +0
        1 2-cells:
          +0 +1 +2 +3
    ";

    #[test]
    fn test_import_square() {
        let mut space = Space::new();
        let p = import_polytope(&mut space, SQUARE).expect("valid square");
        assert_eq!(space.element_counts(p.id), vec![4, 4, 1]);
        assert_approx_eq!(volume(&space, p), 1.0);
        assert!(is_oriented_deep(&space, p.id));
    }

    #[test]
    fn test_import_unknown_signs() {
        let mut space = Space::new();
        let text = SQUARE.replace("-0 +1", "!1 !0").replace("+0 +1 +2 +3", "!3 !2 !1 !0");
        let p = import_polytope(&mut space, &text).expect("valid square");
        assert_approx_eq!(volume(&space, p), 1.0);
        assert!(is_oriented_deep(&space, p.id));
    }

    #[test]
    fn test_import_errors() {
        let mut space = Space::new();
        let mut check = |text: &str, line: usize, kind: ImportErrorKind| {
            assert_eq!(import_polytope(&mut space, text), Err(ImportError { line, kind }));
        };

        check("", 1, ImportErrorKind::Empty);
        check("0 0\n", 1, ImportErrorKind::MissingHeader(0));
        check(
            "1 1-cells:\n",
            1,
            ImportErrorKind::WrongRank {
                expected: 0,
                found: 1,
            },
        );
        check(
            "2 0-cells:\n0 0\n0 0 0\n",
            3,
            ImportErrorKind::ArityMismatch {
                expected: 2,
                found: 3,
            },
        );
        check("1 0-cells:\n0 zero\n", 2, ImportErrorKind::Syntax("0 zero".to_owned()));

        let lines = SQUARE.lines().collect_vec();
        let line_of = |needle: &str| {
            1 + lines.iter().position(|l| l.contains(needle)).expect("line exists")
        };

        check(
            &SQUARE.replace("4 1-cells:", "5 1-cells:"),
            line_of("1-cells:"),
            ImportErrorKind::CountMismatch {
                rank: 1,
                expected: 5,
                found: 4,
            },
        );
        check(
            &SQUARE.replace("-3 +0", "-3 +4"),
            line_of("-3 +0"),
            ImportErrorKind::IndexOutOfRange {
                rank: 0,
                index: 4,
                count: 4,
            },
        );
        check(
            &SQUARE.replace("+0 +1 +2 +3", "+0 -1 +2 +3"),
            line_of("+0 +1 +2 +3"),
            ImportErrorKind::Unoriented(2),
        );
        check(
            &SQUARE.replace("+0 +1 +2 +3", "+0 +1 +2"),
            line_of("+0 +1 +2 +3"),
            ImportErrorKind::NotClosed(2),
        );
    }

    #[test]
    fn test_reject_vertex_on_too_many_hyperplanes() {
        // Square pyramid. The apex lies on all four sloped faces.
        let text = "
            5 0-cells:
              -1 -1 0
               1 -1 0
               1  1 0
              -1  1 0
               0  0 1
            8 1-cells:
              !0 !1
              !1 !2
              !2 !3
              !3 !0
              !0 !4
              !1 !4
              !2 !4
              !3 !4
            5 2-cells:
              !0 !1 !2 !3
              !0 !5 !4
              !1 !6 !5
              !2 !7 !6
              !3 !4 !7
            1 3-cells:
              !0 !1 !2 !3 !4
        ";
        let apex_line = 1 + text.lines().position(|l| l.trim() == "0  0 1").expect("apex line");

        let mut space = Space::new();
        assert_eq!(
            import_polytope(&mut space, text),
            Err(ImportError {
                line: apex_line,
                kind: ImportErrorKind::TooManyHyperplanesAtVertex {
                    vertex: 4,
                    count: 4,
                    ndim: 3,
                },
            }),
        );

        // A vertex in the middle of a straight edge lies on only one line.
        let text = "
            5 0-cells:
              0 0
              1 0
              2 0
              2 1
              0 1
            5 1-cells:
              !0 !1
              !1 !2
              !2 !3
              !3 !4
              !4 !0
            1 2-cells:
              !0 !1 !2 !3 !4
        ";
        let middle_line = 1 + text.lines().position(|l| l.trim() == "1 0").expect("middle line");
        assert_eq!(
            import_polytope(&mut space, text),
            Err(ImportError {
                line: middle_line,
                kind: ImportErrorKind::TooFewHyperplanesAtVertex { vertex: 1, count: 1 },
            }),
        );
    }

    #[test]
    fn test_export_import_cube() {
        let mut space = Space::new();
        let cube = make_hypercube(&mut space, &vector![0.0, 0.0, 0.0], &vector![1.0, 2.0, 3.0])
            .expect("cube");
        let text = export_polytope(&space, cube).expect("export");
        assert!(text.starts_with("8 0-cells:"));

        let imported = import_polytope(&mut space, &text).expect("import");
        assert_eq!(space.element_counts(imported.id), vec![8, 12, 6, 1]);
        assert_approx_eq!(volume(&space, imported), 48.0);
        assert!(is_oriented_deep(&space, imported.id));

        let complement = space.whole(3, 3).expect("whole");
        assert!(export_polytope(&space, complement).is_err());
    }
}
