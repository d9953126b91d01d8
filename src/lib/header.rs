//! Header checks and `@PG` bookkeeping.

use std::collections::HashSet;

use anyhow::Result;
use bstr::BString;
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::map::header::sort_order::COORDINATE;
use noodles::sam::header::record::value::map::program::tag;

use crate::errors::MatefixError;

/// Program name and base `@PG` ID.
pub const PROGRAM_NAME: &str = "matefix";

/// True if the `@HD` line declares `SO:<sort_order>`.
#[must_use]
pub fn is_sorted(header: &Header, sort_order: &[u8]) -> bool {
    header.header().is_some_and(|hd| {
        hd.other_fields().get(b"SO").is_some_and(|so| <_ as AsRef<[u8]>>::as_ref(so) == sort_order)
    })
}

/// Refuse inputs whose header declares coordinate sort order.
///
/// Mates must be adjacent for templates to be grouped, which coordinate sorting
/// does not give.
///
/// # Errors
///
/// Returns [`MatefixError::CoordinateSorted`] for `SO:coordinate`.
pub fn check_sort_order(header: &Header) -> crate::errors::Result<()> {
    if is_sorted(header, COORDINATE) {
        return Err(MatefixError::CoordinateSorted);
    }
    Ok(())
}

/// ID of the last program in the `@PG` chain: the one no other program names as `PP`.
#[must_use]
pub fn get_last_program_id(header: &Header) -> Option<String> {
    let programs = header.programs();
    let programs = programs.as_ref();

    let referenced: HashSet<&[u8]> = programs
        .values()
        .filter_map(|pg| pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID))
        .map(AsRef::as_ref)
        .collect();

    programs
        .keys()
        .find(|id| !referenced.contains(id.as_slice()))
        .or_else(|| programs.keys().next())
        .map(|id| String::from_utf8_lossy(id).into_owned())
}

/// `base_id`, or `base_id.N` for the smallest `N` not already taken.
#[must_use]
pub fn make_unique_program_id(header: &Header, base_id: &str) -> String {
    let programs = header.programs();
    let programs = programs.as_ref();
    if !programs.contains_key(base_id.as_bytes()) {
        return base_id.to_string();
    }
    (1..)
        .map(|i| format!("{base_id}.{i}"))
        .find(|candidate| !programs.contains_key(candidate.as_bytes()))
        .unwrap_or_else(|| base_id.to_string())
}

/// Build a `@PG` record for this program.
///
/// # Errors
///
/// Returns an error if the record cannot be built.
pub fn build_program_record(
    version: &str,
    command_line: &str,
    previous_program: Option<&str>,
) -> Result<Map<Program>> {
    let mut builder = Map::<Program>::builder()
        .insert(tag::NAME, PROGRAM_NAME)
        .insert(tag::VERSION, version)
        .insert(tag::COMMAND_LINE, command_line);
    if let Some(pp) = previous_program {
        builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp);
    }
    Ok(builder.build()?)
}

/// Append a `@PG` record chained to the last existing program.
///
/// # Errors
///
/// Returns an error if the record cannot be built or added.
pub fn add_pg_record(mut header: Header, version: &str, command_line: &str) -> Result<Header> {
    let previous_program = get_last_program_id(&header);
    let id = make_unique_program_id(&header, PROGRAM_NAME);
    let record = build_program_record(version, command_line, previous_program.as_deref())?;
    header.programs_mut().add(BString::from(id), record)?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(text: &str) -> Header {
        text.parse().unwrap()
    }

    #[rstest]
    #[case::coordinate("@HD\tVN:1.6\tSO:coordinate\n", true)]
    #[case::queryname("@HD\tVN:1.6\tSO:queryname\n", false)]
    #[case::unsorted("@HD\tVN:1.6\tSO:unsorted\n", false)]
    #[case::no_sort_order("@HD\tVN:1.6\n", false)]
    #[case::no_hd("", false)]
    fn test_check_sort_order(#[case] text: &str, #[case] refused: bool) {
        let result = check_sort_order(&parse(text));
        assert_eq!(matches!(result, Err(MatefixError::CoordinateSorted)), refused);
    }

    #[test]
    fn test_last_program_follows_pp_chain() {
        let header = parse("@PG\tID:bwa\n@PG\tID:samtools\tPP:bwa\n");
        assert_eq!(get_last_program_id(&header).as_deref(), Some("samtools"));
        assert_eq!(get_last_program_id(&Header::default()), None);
    }

    #[test]
    fn test_unique_program_id() {
        assert_eq!(make_unique_program_id(&Header::default(), "matefix"), "matefix");
        let header = parse("@PG\tID:matefix\n@PG\tID:matefix.1\tPP:matefix\n");
        assert_eq!(make_unique_program_id(&header, "matefix"), "matefix.2");
    }

    #[test]
    fn test_add_pg_record() {
        let header = parse("@HD\tVN:1.6\tSO:queryname\n@PG\tID:bwa\tPN:bwa\n");
        let header = add_pg_record(header, "1.2.3", "matefix fixmate in.bam out.bam").unwrap();

        let programs = header.programs();
        let pg = programs.as_ref().get(b"matefix".as_slice()).unwrap();
        let fields = pg.other_fields();
        assert_eq!(fields.get(&tag::NAME).map(AsRef::as_ref), Some(b"matefix".as_slice()));
        assert_eq!(fields.get(&tag::VERSION).map(AsRef::as_ref), Some(b"1.2.3".as_slice()));
        assert_eq!(fields.get(&tag::PREVIOUS_PROGRAM_ID).map(AsRef::as_ref), Some(b"bwa".as_slice()));
        assert_eq!(
            fields.get(&tag::COMMAND_LINE).map(AsRef::as_ref),
            Some(b"matefix fixmate in.bam out.bam".as_slice())
        );
    }
}
