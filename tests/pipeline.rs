use ifc_ids_checker::check::{derive_status, run_check, ResultsStore, FAIL_THRESHOLD};
use ifc_ids_checker::highlight::{self, HighlightStyle};
use ifc_ids_checker::ids::SpecificationStore;
use ifc_ids_checker::model::{CheckContext, Status};
use ifc_ids_checker::parser::{parse_ifc_str, LoadedModel};
use ifc_ids_checker::reconcile::StatusReconciler;
use pretty_assertions::assert_eq;
use std::time::Duration;

const WALL_A: &str = "0K7w7JjvL0JAG3nPpwpz7S";
const WALL_B: &str = "1RsIX3oEbDVQDe4x1YrFsR";
const WALL_C: &str = "2sKnx4wD10Dfd0kQ8$JZ7r";
const SLAB: &str = "3Zu5Bv0LOHrPC10026FoQQ";

const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('1xS3BCk291UvhgP2a6eflK',$,'Pipeline',$,$,$,$,$,$);
#10=IFCWALL('0K7w7JjvL0JAG3nPpwpz7S',$,'Wall A',$,$,$,$,$,$);
#11=IFCWALL('1RsIX3oEbDVQDe4x1YrFsR',$,'Wall B',$,$,$,$,$,$);
#12=IFCWALL('2sKnx4wD10Dfd0kQ8$JZ7r',$,'Wall C',$,$,$,$,$,$);
#13=IFCSLAB('3Zu5Bv0LOHrPC10026FoQQ',$,'Slab',$,$,$,$,$,$);
#20=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('F60'),$);
#21=IFCPROPERTYSINGLEVALUE('ThermalTransmittance',$,IFCTHERMALTRANSMITTANCEMEASURE(0.2),$);
#22=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.F.),$);
#23=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#30=IFCPROPERTYSET('0tA4DSHd50le6Ov9Yu0I9X',$,'Pset_WallCommon',$,(#20,#21,#22));
#31=IFCPROPERTYSET('1tA4DSHd50le6Ov9Yu0I9X',$,'Pset_WallCommon',$,(#20));
#32=IFCPROPERTYSET('2tA4DSHd50le6Ov9Yu0I9X',$,'Pset_SlabCommon',$,(#23));
#40=IFCRELDEFINESBYPROPERTIES('0ZKm1YfDr8dQPfWu1hMAdq',$,$,$,(#10),#30);
#41=IFCRELDEFINESBYPROPERTIES('1ZKm1YfDr8dQPfWu1hMAdq',$,$,$,(#12),#31);
#42=IFCRELDEFINESBYPROPERTIES('2ZKm1YfDr8dQPfWu1hMAdq',$,$,$,(#13),#32);
ENDSEC;
END-ISO-10303-21;
";

fn wall_spec(name: &str, property: &str) -> String {
    format!(
        r#"<ids:specification name="{name}">
      <ids:applicability><ids:entity><ids:name><ids:simpleValue>IFCWALL</ids:simpleValue></ids:name></ids:entity></ids:applicability>
      <ids:requirements>
        <ids:property cardinality="required">
          <ids:propertySet><ids:simpleValue>Pset_WallCommon</ids:simpleValue></ids:propertySet>
          <ids:baseName><ids:simpleValue>{property}</ids:simpleValue></ids:baseName>
        </ids:property>
      </ids:requirements>
    </ids:specification>"#
    )
}

fn ids_document() -> String {
    format!(
        r#"<ids:ids xmlns:ids="http://standards.buildingsmart.org/IDS">
  <ids:info><ids:title>Pipeline rules</ids:title></ids:info>
  <ids:specifications>
    {}
    {}
    {}
    <ids:specification name="Broken filter">
      <ids:applicability><ids:entity><ids:name><ids:simpleValue>Wall</ids:simpleValue></ids:name></ids:entity></ids:applicability>
      <ids:requirements>
        <ids:property><ids:baseName><ids:simpleValue>Name</ids:simpleValue></ids:baseName></ids:property>
      </ids:requirements>
    </ids:specification>
    <ids:specification name="Slab exposure">
      <ids:applicability><ids:entity><ids:name><ids:simpleValue>IFCSLAB</ids:simpleValue></ids:name></ids:entity></ids:applicability>
      <ids:requirements>
        <ids:property>
          <ids:propertySet><ids:simpleValue>Pset_SlabCommon</ids:simpleValue></ids:propertySet>
          <ids:baseName><ids:simpleValue>IsExternal</ids:simpleValue></ids:baseName>
        </ids:property>
      </ids:requirements>
    </ids:specification>
  </ids:specifications>
</ids:ids>"#,
        wall_spec("Fire rating", "FireRating"),
        wall_spec("Thermal", "ThermalTransmittance"),
        wall_spec("Load bearing", "LoadBearing"),
    )
}

fn setup() -> (LoadedModel, SpecificationStore) {
    let model = parse_ifc_str("pipeline", MODEL).unwrap();
    let mut store = SpecificationStore::new();
    store.load(&ids_document());
    (model, store)
}

#[test]
fn statuses_follow_failed_specification_count() {
    let (model, store) = setup();
    assert_eq!(store.specs().len(), 5);

    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].name, "Broken filter");
    assert_eq!(run.results.summary.total_specs, 4);
    assert_eq!(run.results.summary.failed_specs, 3);

    let results = Some(&run.results);
    assert_eq!(run.results.fail_count(WALL_B), FAIL_THRESHOLD);
    assert_eq!(derive_status(WALL_A, results), Status::Pass);
    assert_eq!(derive_status(WALL_B, results), Status::Fail);
    assert_eq!(derive_status(WALL_C, results), Status::Warn);
    assert_eq!(derive_status(SLAB, results), Status::Pass);
}

#[test]
fn highlights_never_mark_a_failing_element_as_passing() {
    let (mut model, store) = setup();
    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    let results = &run.results;

    let pass = highlight::disjoint_pass_set(&results.all_pass, &results.all_fail);
    assert_eq!(pass, vec![WALL_A.to_string(), SLAB.to_string()]);

    highlight::apply(&mut model, &pass, &results.all_fail);
    assert_eq!(model.style_of(WALL_A), Some(HighlightStyle::Pass));
    assert_eq!(model.style_of(WALL_B), Some(HighlightStyle::Fail));
    assert_eq!(model.style_of(WALL_C), Some(HighlightStyle::Fail));
    assert_eq!(model.style_of(SLAB), Some(HighlightStyle::Pass));
}

#[test]
fn unusable_ids_document_checks_nothing() {
    let model = parse_ifc_str("pipeline", MODEL).unwrap();
    let mut store = SpecificationStore::new();
    store.load("this is not an IDS document");
    assert!(store.is_empty());

    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    assert_eq!(run.results.summary.total_specs, 0);
    assert!(run.results.all_pass.is_empty() && run.results.all_fail.is_empty());
    assert_eq!(derive_status(WALL_B, None), Status::Unknown);
}

#[tokio::test(start_paused = true)]
async fn selected_element_follows_new_results() {
    let (model, store) = setup();
    let results = ResultsStore::new();
    let mut reconciler = StatusReconciler::new(results.clone(), Duration::from_millis(100));

    let wall_b = model.project_element(WALL_B).unwrap();
    assert_eq!(reconciler.select(wall_b).status, Status::Unknown);

    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    results.publish(run.results);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(reconciler.selected().unwrap().status, Status::Fail);

    reconciler.deselect();
    assert!(reconciler.selected().is_none());
}

#[test]
fn standard_case_elements_are_evaluated() {
    let model = parse_ifc_str(
        "doors",
        "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#12=IFCDOORSTANDARDCASE('3cUkl32yn9qRSPvBJVyWYp',$,'Door 1',$,$,$,$,$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
",
    )
    .unwrap();
    let mut store = SpecificationStore::new();
    store.load(
        r#"<ids:ids xmlns:ids="http://standards.buildingsmart.org/IDS"><ids:specifications>
    <ids:specification name="Door fire rating">
      <ids:applicability><ids:entity><ids:name><ids:simpleValue>IFCDOORSTANDARDCASE</ids:simpleValue></ids:name></ids:entity></ids:applicability>
      <ids:requirements>
        <ids:property>
          <ids:propertySet><ids:simpleValue>Pset_DoorCommon</ids:simpleValue></ids:propertySet>
          <ids:baseName><ids:simpleValue>FireRating</ids:simpleValue></ids:baseName>
        </ids:property>
      </ids:requirements>
    </ids:specification>
  </ids:specifications></ids:ids>"#,
    );

    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    assert_eq!(run.results.fail_count("3cUkl32yn9qRSPvBJVyWYp"), 1);
    assert_eq!(
        derive_status("3cUkl32yn9qRSPvBJVyWYp", Some(&run.results)),
        Status::Warn
    );
}
