mod mock_engine;

use image::Rgb;
use bvr_perception::aggregator::DetectionAggregator;
use mock_engine::{class_names, detection, frame, init_logging};

#[test]
fn person_and_car_example() {
    init_logging();
    let mut aggregator = DetectionAggregator::new(&class_names());

    let buckets = aggregator.aggregate(vec![detection(1, 0.9, 10., 10., 50., 50.)]);

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].label(), "person");
    assert!(buckets[0].is_empty());
    assert_eq!(buckets[0].count(), 0);

    assert_eq!(buckets[1].label(), "car");
    assert_eq!(buckets[1].count(), 1);
    let car = &buckets[1].detections()[0];
    assert_eq!(car.confidence, 0.9);
    assert_eq!(car.bbox.xy1_wh(), (10., 10., 50., 50.));
    assert_eq!(car.get_label(), "car");
}

#[test]
fn counts_match_detections() {
    let mut aggregator = DetectionAggregator::new(&class_names());
    let cycles = vec![
        vec![],
        vec![detection(0, 0.5, 0., 0., 5., 5.)],
        vec![
            detection(1, 0.7, 0., 0., 5., 5.),
            detection(0, 0.6, 1., 1., 5., 5.),
            detection(1, 0.8, 2., 2., 5., 5.),
            detection(1, 0.4, 3., 3., 5., 5.),
        ],
    ];

    for raw in cycles {
        let expected = raw.len();
        aggregator.aggregate(raw);
        for bucket in aggregator.buckets() {
            assert_eq!(bucket.count(), bucket.detections().len());
        }
        assert_eq!(aggregator.total_count(), expected);
    }
}

#[test]
fn arrival_order_is_kept_per_class() {
    let mut aggregator = DetectionAggregator::new(&class_names());
    aggregator.aggregate(vec![
        detection(1, 0.3, 0., 0., 5., 5.),
        detection(0, 0.9, 0., 0., 5., 5.),
        detection(1, 0.7, 0., 0., 5., 5.),
    ]);

    let confidences: Vec<f32> = aggregator.bucket(1).unwrap().detections().iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.3, 0.7]);
}

#[test]
fn empty_cycle_clears_previous_results() {
    let mut aggregator = DetectionAggregator::new(&class_names());
    aggregator.aggregate(vec![detection(0, 0.9, 0., 0., 5., 5.), detection(1, 0.9, 0., 0., 5., 5.)]);
    assert_eq!(aggregator.total_count(), 2);

    aggregator.aggregate(vec![]);
    assert!(aggregator.buckets().iter().all(|bucket| bucket.is_empty()));
    assert_eq!(aggregator.total_count(), 0);
}

#[test]
fn colours_are_stable_across_cycles() {
    let mut aggregator = DetectionAggregator::new(&class_names());
    assert_eq!(aggregator.colours().len(), 2);
    let before: Vec<Rgb<u8>> = aggregator.buckets().iter().map(|b| b.colour()).collect();

    aggregator.aggregate(vec![detection(1, 0.9, 0., 0., 5., 5.)]);
    aggregator.aggregate(vec![]);
    let after: Vec<Rgb<u8>> = aggregator.buckets().iter().map(|b| b.colour()).collect();

    assert_eq!(before, after);
    assert_eq!(before[0], Rgb([255, 0, 255]));
    assert_eq!(before[1], Rgb([128, 127, 128]));
}

#[test]
fn unknown_class_is_dropped() {
    init_logging();
    let mut aggregator = DetectionAggregator::new(&class_names());
    aggregator.aggregate(vec![detection(7, 0.9, 0., 0., 5., 5.), detection(0, 0.9, 0., 0., 5., 5.)]);
    assert_eq!(aggregator.total_count(), 1);
}

#[test]
fn bounding_boxes_carry_frame_dims() {
    let mut aggregator = DetectionAggregator::new(&class_names());
    aggregator.aggregate(vec![
        detection(1, 0.9, 10., 10., 50., 50.),
        detection(0, 0.6, 1., 2., 3., 4.),
    ]);
    let frame = frame().with_seq(7);

    let boxes = aggregator.bounding_boxes(&frame);
    assert_eq!((boxes.image_width, boxes.image_height, boxes.frame_seq), (100, 100, 7));
    assert_eq!(boxes.len(), 2);

    // Class order, then arrival order.
    let person = &boxes.bounding_boxes[0];
    assert_eq!((person.class_id, person.label.as_str()), (0, "person"));
    let car = &boxes.bounding_boxes[1];
    assert_eq!((car.xmin, car.ymin, car.xmax, car.ymax), (10, 10, 60, 60));
    assert_eq!(car.probability, 0.9);
}
