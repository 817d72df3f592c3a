mod include_tests;
